//! Packing of engine output layers into one flat caller-owned buffer.

use crate::error::EncoderError;

/// Total byte length of all layers, saturating on overflow.
pub fn total_len(layers: &[&[u8]]) -> usize {
    layers
        .iter()
        .fold(0usize, |acc, layer| acc.saturating_add(layer.len()))
}

/// Concatenate `layers` into the front of `output` in the order given.
///
/// Nothing is written if the total size exceeds `output.len()`. Capacity is
/// also re-checked before every layer so the copy can never run past the end
/// of the buffer. Returns the number of bytes written.
pub fn pack_layers(layers: &[&[u8]], output: &mut [u8]) -> Result<usize, EncoderError> {
    let required = total_len(layers);
    let capacity = output.len();
    if required > capacity {
        return Err(EncoderError::OutputBufferTooSmall { required, capacity });
    }

    let mut offset = 0usize;
    for layer in layers {
        let end = offset
            .checked_add(layer.len())
            .filter(|end| *end <= capacity)
            .ok_or(EncoderError::OutputBufferTooSmall { required, capacity })?;
        output[offset..end].copy_from_slice(layer);
        offset = end;
    }
    Ok(offset)
}
