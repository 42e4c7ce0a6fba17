//! Flat row x channel array of 5-byte note records.

/// One note record: `(key, instrument, volume, effect, param)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Note {
    pub key: i32,
    pub instrument: i32,
    pub volume: i32,
    pub effect: i32,
    pub param: i32,
}

/// A pattern: `numRows` rows of `numChannels` notes each, stored flat.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub num_rows: usize,
    pub data: Vec<u8>,
}

impl Pattern {
    pub fn new(num_channels: usize, num_rows: usize) -> Self {
        Pattern {
            num_rows,
            data: vec![0u8; num_channels * num_rows * 5],
        }
    }

    /// Reads the note at flat `index` (row * numChannels + channel) into `note`.
    pub fn get_note(&self, index: usize, note: &mut Note) {
        let offset = index * 5;
        note.key = self.data[offset] as i32;
        note.instrument = self.data[offset + 1] as i32;
        note.volume = self.data[offset + 2] as i32;
        note.effect = self.data[offset + 3] as i32;
        note.param = self.data[offset + 4] as i32;
    }

    /// Writes a note at flat `index`, used by decoders while unpacking rows.
    pub fn set_note(&mut self, index: usize, note: &Note) {
        let offset = index * 5;
        self.data[offset] = note.key as u8;
        self.data[offset + 1] = note.instrument as u8;
        self.data[offset + 2] = note.volume as u8;
        self.data[offset + 3] = note.effect as u8;
        self.data[offset + 4] = note.param as u8;
    }
}
