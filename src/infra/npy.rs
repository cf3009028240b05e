// ============================================================
// Layer 6 — NumPy `.npy` Codec
// ============================================================
// Reads and writes the NumPy v1.0 array format so that test
// logits/labels can be analysed offline (confusion matrices,
// score fusion) and preprocessed datasets can be loaded.
//
// Layout:
//   \x93NUMPY  major minor  header_len(u16 LE)  header  data
//
// The header is a Python dict literal padded with spaces and
// terminated by '\n' so that the data starts on a 64-byte
// boundary:
//   {'descr': '<f4', 'fortran_order': False, 'shape': (40, 60), }
//
// Only little-endian, C-ordered arrays are supported.

use anyhow::{bail, ensure, Context, Result};
use std::{fs, path::Path};

const MAGIC: &[u8; 6] = b"\x93NUMPY";
const ALIGN: usize    = 64;

/// Scalar types that can be stored in an `.npy` file.
pub trait NpyElement: Copy + Sized {
    /// NumPy dtype string, e.g. `<f4`
    const DESCR: &'static str;
    const SIZE:  usize;

    fn write_le(self, out: &mut Vec<u8>);
    /// `bytes` is exactly `SIZE` long
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! npy_element {
    ($ty:ty, $descr:literal) => {
        impl NpyElement for $ty {
            const DESCR: &'static str = $descr;
            const SIZE:  usize        = std::mem::size_of::<$ty>();

            fn write_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            fn read_le(bytes: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(bytes);
                <$ty>::from_le_bytes(raw)
            }
        }
    };
}

npy_element!(f32, "<f4");
npy_element!(i32, "<i4");
npy_element!(i64, "<i8");

/// A dense C-ordered array with its shape.
#[derive(Debug, Clone, PartialEq)]
pub struct NpyArray<T> {
    pub shape: Vec<usize>,
    pub data:  Vec<T>,
}

impl<T: NpyElement> NpyArray<T> {
    pub fn new(shape: Vec<usize>, data: Vec<T>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        ensure!(
            expected == data.len(),
            "shape {shape:?} needs {expected} elements, got {}",
            data.len()
        );
        Ok(Self { shape, data })
    }

    /// Length of the leading dimension (0 for a scalar)
    pub fn rows(&self) -> usize {
        self.shape.first().copied().unwrap_or(0)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let shape = match self.shape.as_slice() {
            [one] => format!("({one},)"),
            dims  => format!(
                "({})",
                dims.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(", ")
            ),
        };
        let mut header = format!(
            "{{'descr': '{}', 'fortran_order': False, 'shape': {}, }}",
            T::DESCR, shape
        );
        // 6 magic + 2 version + 2 length bytes precede the header
        let unpadded = MAGIC.len() + 4 + header.len() + 1;
        let padding  = (ALIGN - unpadded % ALIGN) % ALIGN;
        header.extend(std::iter::repeat(' ').take(padding));
        header.push('\n');

        let mut out = Vec::with_capacity(MAGIC.len() + 4 + header.len() + self.data.len() * T::SIZE);
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&[1, 0]);
        out.extend_from_slice(&(header.len() as u16).to_le_bytes());
        out.extend_from_slice(header.as_bytes());
        for &value in &self.data {
            value.write_le(&mut out);
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (header, body) = split_header(bytes)?;
        let descr = header_value(&header, "descr")?;
        ensure!(
            descr.trim_matches('\'') == T::DESCR,
            "expected dtype {}, found {descr}",
            T::DESCR
        );
        ensure!(
            header_value(&header, "fortran_order")? == "False",
            "fortran-ordered arrays are not supported"
        );
        let shape = parse_shape(&header_value(&header, "shape")?)?;

        let count: usize = shape.iter().product();
        ensure!(
            body.len() == count * T::SIZE,
            "array body holds {} bytes, shape {shape:?} needs {}",
            body.len(),
            count * T::SIZE
        );
        let data = body.chunks_exact(T::SIZE).map(T::read_le).collect();
        Ok(Self { shape, data })
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_bytes())
            .with_context(|| format!("Cannot write array to '{}'", path.display()))?;
        tracing::debug!("Wrote {:?} {} array to '{}'", self.shape, T::DESCR, path.display());
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)
            .with_context(|| format!("Cannot read array from '{}'", path.display()))?;
        Self::from_bytes(&bytes)
            .with_context(|| format!("Malformed .npy file '{}'", path.display()))
    }
}

/// Read an integer label array stored as either int64 or int32.
pub fn read_labels(path: &Path) -> Result<NpyArray<i64>> {
    let bytes = fs::read(path)
        .with_context(|| format!("Cannot read labels from '{}'", path.display()))?;
    let (header, _) = split_header(&bytes)?;
    let descr = header_value(&header, "descr")?;
    match descr.trim_matches('\'') {
        "<i8" => NpyArray::<i64>::from_bytes(&bytes),
        "<i4" => {
            let narrow = NpyArray::<i32>::from_bytes(&bytes)?;
            Ok(NpyArray {
                shape: narrow.shape,
                data:  narrow.data.into_iter().map(i64::from).collect(),
            })
        }
        other => bail!("labels in '{}' have unsupported dtype {other}", path.display()),
    }
}

// ─── Header parsing ───────────────────────────────────────────────────────────

fn split_header(bytes: &[u8]) -> Result<(String, &[u8])> {
    ensure!(bytes.len() >= 10 && &bytes[..6] == MAGIC, "missing .npy magic string");
    let (len, start) = match bytes[6] {
        1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10),
        2 | 3 => {
            ensure!(bytes.len() >= 12, "truncated .npy header");
            (u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize, 12)
        }
        v => bail!("unsupported .npy version {v}"),
    };
    ensure!(bytes.len() >= start + len, "truncated .npy header");
    let header = String::from_utf8(bytes[start..start + len].to_vec())
        .context(".npy header is not valid text")?;
    Ok((header, &bytes[start + len..]))
}

/// Raw text of `'key': value` inside the header dict
fn header_value(header: &str, key: &str) -> Result<String> {
    let tag = format!("'{key}':");
    let Some(pos) = header.find(&tag) else {
        bail!("header has no '{key}' entry");
    };
    let rest = header[pos + tag.len()..].trim_start();
    let end = if rest.starts_with('(') {
        rest.find(')').map(|i| i + 1)
    } else {
        rest.find([',', '}'])
    };
    match end {
        Some(end) => Ok(rest[..end].trim().to_string()),
        None      => bail!("unterminated '{key}' entry"),
    }
}

fn parse_shape(text: &str) -> Result<Vec<usize>> {
    let inner = text.trim_start_matches('(').trim_end_matches(')');
    inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<usize>().with_context(|| format!("bad dimension '{s}' in shape {text}")))
        .collect()
}
