/// Byte-sum integrity tag: `0xFF - (sum mod 256)`.
///
/// Buffers whose byte sums are congruent mod 256 share a tag, so this only
/// catches a subset of corruptions. An all-zero buffer tags as `0xFF`.
pub fn checksum(buf: &[u8]) -> u8 {
	let sum = buf.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
	0xFF - sum
}
