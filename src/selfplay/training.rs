use std::fs::{create_dir_all, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use cozy_chess::Color;

use crate::eval::InputFormat;
use crate::search::BestEval;
use crate::tree::{GameResult, NodeTree};

/// Snapshot captured after each applied move, from the position *before* the
/// move. `result` and `plies_left` stay at their placeholders until the game
/// concludes and `backfill_records` fills them in.
#[derive(Clone, Copy, Debug)]
pub struct TrainingRecord {
    pub key: u64,
    pub input_format: InputFormat,
    pub side_to_move_or_enpassant: u8,
    pub invariance_info: u8,
    pub result: i8,
    pub best_wl: f32,
    pub best_d: f32,
    pub best_ml: f32,
    pub plies_left: f32,
}

impl TrainingRecord {
    /// Capture the head position of `tree` with the outcome left undecided.
    pub fn capture(tree: &NodeTree, format: InputFormat, best_eval: BestEval) -> Self {
        let board = tree.head_board();
        let black_to_move = board.side_to_move() == Color::Black;
        let (side_to_move_or_enpassant, invariance_info) = match format {
            InputFormat::Classic => (u8::from(black_to_move), 0),
            InputFormat::Canonical => (
                board.en_passant().map_or(0, |file| 1u8 << file as usize),
                u8::from(black_to_move) << 7,
            ),
        };
        Self {
            key: board.hash(),
            input_format: format,
            side_to_move_or_enpassant,
            invariance_info,
            result: 0,
            best_wl: best_eval.wl,
            best_d: best_eval.d,
            best_ml: best_eval.ml,
            plies_left: 0.0,
        }
    }

    /// Side to move at capture time, decoding the canonical layout where the
    /// flag lives in bit 7 of the invariance field.
    pub fn black_to_move(&self) -> bool {
        match self.input_format {
            InputFormat::Classic => self.side_to_move_or_enpassant != 0,
            InputFormat::Canonical => self.invariance_info & (1 << 7) != 0,
        }
    }
}

/// Consumer of finished, backfilled records; called once per record in
/// capture order.
pub trait TrainingWriter {
    fn write(&mut self, record: &TrainingRecord) -> std::io::Result<()>;
}

/// Assign outcome and moves-remaining labels to a finished game's records
/// and hand them to the writer in capture order.
///
/// The moves-remaining countdown is anchored on the final record's own
/// moves-left estimate so it reaches the model's number at the last move
/// rather than an arbitrary baseline.
pub fn backfill_records(
    records: &[TrainingRecord],
    result: GameResult,
    writer: &mut dyn TrainingWriter,
) -> std::io::Result<()> {
    if records.is_empty() {
        return Ok(());
    }
    let mut m_estimate = records[records.len() - 1].best_ml + (records.len() - 1) as f32;
    for record in records {
        let mut chunk = *record;
        let black_to_move = chunk.black_to_move();
        chunk.result = match result {
            GameResult::WhiteWon => {
                if black_to_move {
                    -1
                } else {
                    1
                }
            }
            GameResult::BlackWon => {
                if black_to_move {
                    1
                } else {
                    -1
                }
            }
            _ => 0,
        };
        chunk.plies_left = m_estimate;
        m_estimate -= 1.0;
        writer.write(&chunk)?;
    }
    Ok(())
}

pub const SHARD_MAGIC: &[u8; 8] = b"PFTR0001"; // Playforge Training v1
pub const RECORD_SIZE: usize = 8 + 4 + 4 * 4;

/// Writes fixed-size records into shard files, rotating at a record cap.
pub struct ShardWriter {
    out_dir: PathBuf,
    max_records_per_shard: usize,
    shard_index: usize,
    records_in_shard: usize,
    writer: Option<BufWriter<File>>,
    paths: Vec<PathBuf>,
}

impl ShardWriter {
    pub fn new<P: AsRef<Path>>(out_dir: P, max_records_per_shard: usize) -> std::io::Result<Self> {
        create_dir_all(&out_dir)?;
        Ok(Self {
            out_dir: out_dir.as_ref().to_path_buf(),
            max_records_per_shard: max_records_per_shard.max(1),
            shard_index: 0,
            records_in_shard: 0,
            writer: None,
            paths: Vec::new(),
        })
    }

    fn start_new_shard(&mut self) -> std::io::Result<()> {
        let path = self.out_dir.join(format!("shard_{:06}.bin", self.shard_index));
        let mut f = BufWriter::new(File::create(&path)?);
        f.write_all(SHARD_MAGIC)?;
        self.paths.push(path);
        self.writer = Some(f);
        self.shard_index += 1;
        self.records_in_shard = 0;
        Ok(())
    }

    /// Flush the current shard and return every shard path written.
    pub fn finish(mut self) -> std::io::Result<Vec<PathBuf>> {
        if let Some(mut w) = self.writer.take() {
            w.flush()?;
        }
        Ok(self.paths)
    }
}

impl TrainingWriter for ShardWriter {
    fn write(&mut self, record: &TrainingRecord) -> std::io::Result<()> {
        if self.writer.is_none() || self.records_in_shard >= self.max_records_per_shard {
            self.start_new_shard()?;
        }
        let mut buf = [0u8; RECORD_SIZE];
        buf[0..8].copy_from_slice(&record.key.to_le_bytes());
        buf[8] = match record.input_format {
            InputFormat::Classic => 0,
            InputFormat::Canonical => 1,
        };
        buf[9] = record.side_to_move_or_enpassant;
        buf[10] = record.invariance_info;
        buf[11] = record.result as u8;
        buf[12..16].copy_from_slice(&record.best_wl.to_le_bytes());
        buf[16..20].copy_from_slice(&record.best_d.to_le_bytes());
        buf[20..24].copy_from_slice(&record.best_ml.to_le_bytes());
        buf[24..28].copy_from_slice(&record.plies_left.to_le_bytes());
        let w = self.writer.as_mut().unwrap();
        w.write_all(&buf)?;
        self.records_in_shard += 1;
        Ok(())
    }
}

pub fn read_shard<P: AsRef<Path>>(path: P) -> std::io::Result<Vec<TrainingRecord>> {
    let mut f = BufReader::new(File::open(path)?);
    let mut magic = [0u8; 8];
    f.read_exact(&mut magic)?;
    if &magic != SHARD_MAGIC {
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "bad magic"));
    }
    let mut records = Vec::new();
    let mut buf = [0u8; RECORD_SIZE];
    loop {
        match f.read_exact(&mut buf) {
            Ok(()) => {
                let mut key = [0u8; 8];
                key.copy_from_slice(&buf[0..8]);
                let mut wl = [0u8; 4];
                wl.copy_from_slice(&buf[12..16]);
                let mut d = [0u8; 4];
                d.copy_from_slice(&buf[16..20]);
                let mut ml = [0u8; 4];
                ml.copy_from_slice(&buf[20..24]);
                let mut plies = [0u8; 4];
                plies.copy_from_slice(&buf[24..28]);
                records.push(TrainingRecord {
                    key: u64::from_le_bytes(key),
                    input_format: if buf[8] == 1 {
                        InputFormat::Canonical
                    } else {
                        InputFormat::Classic
                    },
                    side_to_move_or_enpassant: buf[9],
                    invariance_info: buf[10],
                    result: buf[11] as i8,
                    best_wl: f32::from_le_bytes(wl),
                    best_d: f32::from_le_bytes(d),
                    best_ml: f32::from_le_bytes(ml),
                    plies_left: f32::from_le_bytes(plies),
                });
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e),
        }
    }
    Ok(records)
}
