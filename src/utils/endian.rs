// src/utils/endian.rs
use byteorder::{ByteOrder, LittleEndian, BigEndian};

// `flip_bytes` means the producer wrote big-endian values.

pub fn read_i16(bytes: &[u8], flip_bytes: bool) -> i16 {
    if flip_bytes {
        BigEndian::read_i16(bytes)
    } else {
        LittleEndian::read_i16(bytes)
    }
}

pub fn read_f32(bytes: &[u8], flip_bytes: bool) -> f32 {
    if flip_bytes {
        BigEndian::read_f32(bytes)
    } else {
        LittleEndian::read_f32(bytes)
    }
}

pub fn read_f64(bytes: &[u8], flip_bytes: bool) -> f64 {
    if flip_bytes {
        BigEndian::read_f64(bytes)
    } else {
        LittleEndian::read_f64(bytes)
    }
}
