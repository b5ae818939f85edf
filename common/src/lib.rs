//! Ekho Common Library
//!
//! 点呼の中核: 氏名の正規化・照合・順位付けと出欠台帳。
//! ファイル・音声の入出力は扱わない。

pub mod config;
pub mod error;
pub mod field;
pub mod ledger;
pub mod normalize;
pub mod outcome;
pub mod ranker;
pub mod record;
pub mod session;
pub mod similarity;

pub use config::MatchConfig;
pub use error::{Error, Result};
pub use field::{is_synthetic_field, resolve_name_field, NameFieldSpec, SYNTHETIC_FULL_NAME};
pub use ledger::{AttendanceRecord, AttendanceState, AttendanceStats, AutoConfirmOutcome, Ledger, UpdateOverlay};
pub use normalize::{normalize, tokenize};
pub use outcome::{NoTranscriptionCause, RecognitionOutcome};
pub use ranker::{explain, rank, rank_names, MatchCandidate};
pub use record::{Record, Roster};
pub use session::{AttendanceRow, AttendanceSession};
pub use similarity::{score, score_detailed, score_with, ScoreBreakdown};
