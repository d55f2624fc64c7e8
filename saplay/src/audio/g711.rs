//! G.711 expansion
//!
//! μ-law and A-law streams travel to the transport as encoded bytes; the
//! output side expands them to 16-bit linear before mixing into f32.

const ULAW_BIAS: i32 = 0x84;

/// Expand one μ-law byte to a 16-bit linear sample
pub fn ulaw_to_linear(byte: u8) -> i16 {
    let u = !byte;
    let exponent = (u >> 4) & 0x07;
    let mantissa = (u & 0x0F) as i32;
    let magnitude = (((mantissa << 3) + ULAW_BIAS) << exponent) - ULAW_BIAS;
    if u & 0x80 != 0 {
        -magnitude as i16
    } else {
        magnitude as i16
    }
}

/// Expand one A-law byte to a 16-bit linear sample
pub fn alaw_to_linear(byte: u8) -> i16 {
    let a = byte ^ 0x55;
    let exponent = (a >> 4) & 0x07;
    let mantissa = (a & 0x0F) as i32;
    let magnitude = if exponent == 0 {
        (mantissa << 4) + 8
    } else {
        ((mantissa << 4) + 0x108) << (exponent - 1)
    };
    // A-law sets the sign bit for positive samples
    if a & 0x80 != 0 {
        magnitude as i16
    } else {
        -magnitude as i16
    }
}
