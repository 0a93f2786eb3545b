//! Minimal PNG codec for texture artifacts.
//!
//! Encoding always produces 8-bit RGBA with no scanline filtering. Decoding
//! accepts any non-interlaced 8-bit image (grayscale, RGB, palette,
//! grayscale + alpha, RGBA) with all five scanline filters, which covers
//! what common image editors write back.

use std::io::Read;
use std::io::Write;

use flate2::Compression;
use flate2::Crc;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use super::ImageCodec;
use super::RasterImage;
use crate::Result;
use crate::SyncError;

const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

const COLOR_GRAY: u8 = 0;
const COLOR_RGB: u8 = 2;
const COLOR_PALETTE: u8 = 3;
const COLOR_GRAY_ALPHA: u8 = 4;
const COLOR_RGBA: u8 = 6;

/// Largest pixel count accepted on decode (16384 x 16384).
pub const MAX_PIXELS: u64 = 16384 * 16384;

/// PNG codec backed by `flate2` for zlib streams and chunk CRCs.
#[derive(Debug, Clone, Copy)]
pub struct PngCodec {
    level: Compression,
}

impl Default for PngCodec {
    fn default() -> Self {
        Self {
            level: Compression::default(),
        }
    }
}

impl PngCodec {
    /// Creates a codec with the given zlib level (0-9).
    #[must_use]
    pub fn with_level(level: u32) -> Self {
        Self {
            level: Compression::new(level.min(9)),
        }
    }
}

impl ImageCodec for PngCodec {
    fn encode_png(&self, image: &RasterImage) -> Result<Vec<u8>> {
        image.validate()?;

        let mut out = Vec::with_capacity(image.as_rgba().len() / 2 + 64);
        out.extend_from_slice(&SIGNATURE);

        let mut ihdr = Vec::with_capacity(13);
        ihdr.extend_from_slice(&image.width().to_be_bytes());
        ihdr.extend_from_slice(&image.height().to_be_bytes());
        ihdr.extend_from_slice(&[8, COLOR_RGBA, 0, 0, 0]);
        write_chunk(&mut out, b"IHDR", &ihdr)?;

        let stride = image.width() as usize * 4;
        let mut encoder = ZlibEncoder::new(Vec::new(), self.level);
        if stride > 0 {
            for row in image.as_rgba().chunks(stride) {
                encoder.write_all(&[0])?;
                encoder.write_all(row)?;
            }
        } else {
            for _ in 0..image.height() {
                encoder.write_all(&[0])?;
            }
        }
        let idat = encoder.finish()?;
        write_chunk(&mut out, b"IDAT", &idat)?;
        write_chunk(&mut out, b"IEND", &[])?;

        Ok(out)
    }

    fn decode(&self, bytes: &[u8]) -> Result<RasterImage> {
        let png = parse_chunks(bytes)?;
        let header = png.header;
        let pixels = u64::from(header.width) * u64::from(header.height);
        if pixels > MAX_PIXELS {
            return Err(codec_error(format!(
                "image is {}x{}, larger than {MAX_PIXELS} pixels",
                header.width, header.height
            )));
        }

        let channels = header.channels();
        let stride = (header.width as usize)
            .checked_mul(channels)
            .ok_or_else(|| codec_error("image row too large"))?;
        let expected = stride
            .checked_add(1)
            .and_then(|row| row.checked_mul(header.height as usize))
            .ok_or_else(|| codec_error("image too large"))?;

        // Grows with the actual stream, not the declared size.
        let mut filtered = Vec::new();
        ZlibDecoder::new(png.idat.as_slice())
            .take(expected as u64 + 1)
            .read_to_end(&mut filtered)?;
        if filtered.len() != expected {
            return Err(codec_error(format!(
                "pixel stream is {} bytes, expected {expected}",
                filtered.len()
            )));
        }

        let raw = unfilter(&filtered, stride, channels, header.height as usize)?;
        let rgba = to_rgba(&raw, header.color_type, png.palette.as_deref(), png.trns.as_deref())?;
        RasterImage::new(header.width, header.height, rgba)
    }
}

#[derive(Debug, Clone, Copy)]
struct Header {
    width: u32,
    height: u32,
    color_type: u8,
}

impl Header {
    const fn channels(self) -> usize {
        match self.color_type {
            COLOR_RGB => 3,
            COLOR_GRAY_ALPHA => 2,
            COLOR_RGBA => 4,
            _ => 1,
        }
    }
}

struct ParsedPng {
    header: Header,
    palette: Option<Vec<u8>>,
    trns: Option<Vec<u8>>,
    idat: Vec<u8>,
}

fn codec_error(reason: impl Into<String>) -> SyncError {
    SyncError::ImageCodec(reason.into())
}

fn write_chunk(out: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) -> Result<()> {
    let len = chunk_len(kind, data.len())?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(kind);
    out.extend_from_slice(data);

    let mut crc = Crc::new();
    crc.update(kind);
    crc.update(data);
    out.extend_from_slice(&crc.sum().to_be_bytes());
    Ok(())
}

fn chunk_len(kind: &[u8; 4], len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| {
        codec_error(format!(
            "{} chunk of {len} bytes exceeds the PNG chunk limit",
            String::from_utf8_lossy(kind)
        ))
    })
}

fn read_u32(bytes: &[u8], at: usize) -> Result<u32> {
    bytes
        .get(at..at + 4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_be_bytes)
        .ok_or_else(|| codec_error("truncated PNG"))
}

fn parse_chunks(bytes: &[u8]) -> Result<ParsedPng> {
    if bytes.len() < SIGNATURE.len() || bytes[..SIGNATURE.len()] != SIGNATURE {
        return Err(codec_error("not a PNG file"));
    }

    let mut header = None;
    let mut palette = None;
    let mut trns = None;
    let mut idat = Vec::new();
    let mut pos = SIGNATURE.len();

    loop {
        let len = read_u32(bytes, pos)? as usize;
        let kind_end = pos + 8;
        let data_end = kind_end
            .checked_add(len)
            .filter(|end| end + 4 <= bytes.len())
            .ok_or_else(|| codec_error("truncated PNG chunk"))?;
        let kind = &bytes[pos + 4..kind_end];
        let data = &bytes[kind_end..data_end];

        let mut crc = Crc::new();
        crc.update(kind);
        crc.update(data);
        if crc.sum() != read_u32(bytes, data_end)? {
            return Err(codec_error(format!(
                "CRC mismatch in {} chunk",
                String::from_utf8_lossy(kind)
            )));
        }

        match kind {
            b"IHDR" => header = Some(parse_header(data)?),
            b"PLTE" => palette = Some(data.to_vec()),
            b"tRNS" => trns = Some(data.to_vec()),
            b"IDAT" => idat.extend_from_slice(data),
            b"IEND" => break,
            _ => {}
        }
        pos = data_end + 4;
    }

    let header = header.ok_or_else(|| codec_error("missing IHDR chunk"))?;
    if header.color_type == COLOR_PALETTE && palette.is_none() {
        return Err(codec_error("palette image without PLTE chunk"));
    }
    Ok(ParsedPng {
        header,
        palette,
        trns,
        idat,
    })
}

fn parse_header(data: &[u8]) -> Result<Header> {
    if data.len() != 13 {
        return Err(codec_error("malformed IHDR chunk"));
    }
    let width = read_u32(data, 0)?;
    let height = read_u32(data, 4)?;
    let (bit_depth, color_type) = (data[8], data[9]);
    let (compression, filter, interlace) = (data[10], data[11], data[12]);

    if bit_depth != 8 {
        return Err(codec_error(format!("unsupported bit depth {bit_depth}")));
    }
    if !matches!(
        color_type,
        COLOR_GRAY | COLOR_RGB | COLOR_PALETTE | COLOR_GRAY_ALPHA | COLOR_RGBA
    ) {
        return Err(codec_error(format!("invalid color type {color_type}")));
    }
    if compression != 0 || filter != 0 {
        return Err(codec_error("unknown compression or filter method"));
    }
    if interlace != 0 {
        return Err(codec_error("interlaced PNG is not supported"));
    }
    Ok(Header {
        width,
        height,
        color_type,
    })
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = i16::from(a) + i16::from(b) - i16::from(c);
    let pa = (p - i16::from(a)).abs();
    let pb = (p - i16::from(b)).abs();
    let pc = (p - i16::from(c)).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

fn unfilter(filtered: &[u8], stride: usize, bpp: usize, rows: usize) -> Result<Vec<u8>> {
    let mut out = vec![0u8; stride * rows];
    for y in 0..rows {
        let src = &filtered[y * (stride + 1)..(y + 1) * (stride + 1)];
        let filter = src[0];
        let line = &src[1..];
        let (done, rest) = out.split_at_mut(y * stride);
        let prev = if y == 0 {
            None
        } else {
            Some(&done[(y - 1) * stride..])
        };
        let cur = &mut rest[..stride];

        for x in 0..stride {
            let left = if x >= bpp { cur[x - bpp] } else { 0 };
            let up = prev.map_or(0, |p| p[x]);
            let up_left = if x >= bpp { prev.map_or(0, |p| p[x - bpp]) } else { 0 };
            let predictor = match filter {
                0 => 0,
                1 => left,
                2 => up,
                #[allow(clippy::cast_possible_truncation)]
                3 => ((u16::from(left) + u16::from(up)) / 2) as u8,
                4 => paeth(left, up, up_left),
                other => return Err(codec_error(format!("invalid filter type {other}"))),
            };
            cur[x] = line[x].wrapping_add(predictor);
        }
    }
    Ok(out)
}

fn to_rgba(raw: &[u8], color_type: u8, palette: Option<&[u8]>, trns: Option<&[u8]>) -> Result<Vec<u8>> {
    let mut rgba = Vec::with_capacity(raw.len() * 4);
    match color_type {
        COLOR_RGBA => rgba.extend_from_slice(raw),
        COLOR_RGB => {
            for px in raw.chunks_exact(3) {
                rgba.extend_from_slice(&[px[0], px[1], px[2], 255]);
            }
        }
        COLOR_GRAY => {
            for &v in raw {
                rgba.extend_from_slice(&[v, v, v, 255]);
            }
        }
        COLOR_GRAY_ALPHA => {
            for px in raw.chunks_exact(2) {
                rgba.extend_from_slice(&[px[0], px[0], px[0], px[1]]);
            }
        }
        COLOR_PALETTE => {
            let palette = palette.unwrap_or_default();
            let alpha = trns.unwrap_or_default();
            for &index in raw {
                let i = usize::from(index);
                let rgb = palette
                    .get(i * 3..i * 3 + 3)
                    .ok_or_else(|| codec_error(format!("palette index {index} out of range")))?;
                rgba.extend_from_slice(rgb);
                rgba.push(alpha.get(i).copied().unwrap_or(255));
            }
        }
        other => return Err(codec_error(format!("invalid color type {other}"))),
    }
    Ok(rgba)
}
