//! PackBits style run-length coding for raster rows.

/// Longest run or literal a single control byte can describe.
const MAX_RUN: usize = 128;

/// `true` when a packed row carries no ink at all.
///
/// Blank rows get a dedicated one byte command on the wire instead of a
/// data frame when compression mode is active.
pub fn is_blank(row: &[u8]) -> bool {
    row.iter().all(|&b| b == 0)
}

/// Compress one packed row.
///
/// Runs of two or more identical bytes become `(1 - count, byte)`,
/// stretches of non-repeating bytes become `(count - 1, bytes...)`.
/// Selected per row; a row that would not shrink still encodes
/// losslessly.
pub fn pack_bits(data: &[u8]) -> Vec<u8> {
    let mut packed = Vec::new();
    let mut i = 0;

    while i < data.len() {
        let mut run = 1;
        while i + run < data.len() && run < MAX_RUN && data[i + run] == data[i] {
            run += 1;
        }

        if run >= 2 {
            packed.push((1 - run as i32) as i8 as u8);
            packed.push(data[i]);
            i += run;
        } else {
            let mut literal = 1;
            while i + literal < data.len()
                && literal < MAX_RUN
                && (i + literal + 1 >= data.len() || data[i + literal] != data[i + literal + 1])
            {
                literal += 1;
            }

            packed.push((literal - 1) as u8);
            packed.extend_from_slice(&data[i..i + literal]);
            i += literal;
        }
    }

    packed
}
