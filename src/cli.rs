use clap::{Args, Parser, Subcommand};
use crate::error::{EkhoError, Result};
use ekho_common::NameFieldSpec;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ekho")]
#[command(about = "音声・手入力による出欠確認（点呼）ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// 氏名列の指定（省略時は自動判定）
#[derive(Args, Debug, Clone, Default)]
pub struct NameFieldArgs {
    /// 氏名が入っている列
    #[arg(long, conflicts_with_all = ["given", "family"])]
    pub name_field: Option<String>,

    /// 名の列（--family と併用）
    #[arg(long, requires = "family")]
    pub given: Option<String>,

    /// 姓の列（--given と併用）
    #[arg(long, requires = "given")]
    pub family: Option<String>,
}

impl NameFieldArgs {
    pub fn to_spec(&self) -> Result<Option<NameFieldSpec>> {
        match (&self.name_field, &self.given, &self.family) {
            (Some(field), None, None) => Ok(Some(NameFieldSpec::Single { field: field.clone() })),
            (None, Some(given), Some(family)) => Ok(Some(NameFieldSpec::Paired {
                given: given.clone(),
                family: family.clone(),
            })),
            (None, None, None) => Ok(None),
            _ => Err(EkhoError::Config(
                "--name-field か --given/--family のどちらかを指定してください".into(),
            )),
        }
    }
}

/// 閾値の指定（省略時は設定ファイル）
#[derive(Args, Debug, Clone, Default)]
pub struct ThresholdArgs {
    /// 候補として残す最低スコア (0-100)
    #[arg(short, long)]
    pub threshold: Option<u8>,

    /// 自動で出席にするスコア (0-100)
    #[arg(short, long)]
    pub auto_threshold: Option<u8>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 発話を照合して候補を表示（出欠は変更しない）
    Check {
        /// 名簿JSONファイル
        #[arg(required = true)]
        roster: PathBuf,

        /// 照合する文字列
        #[arg(required = true)]
        utterance: String,

        #[command(flatten)]
        name: NameFieldArgs,

        #[command(flatten)]
        thresholds: ThresholdArgs,

        /// スコアを決めた変種とその内訳を表示
        #[arg(long)]
        explain: bool,
    },

    /// 対話式で点呼する
    Listen {
        /// 名簿JSONファイル
        #[arg(required = true)]
        roster: PathBuf,

        #[command(flatten)]
        name: NameFieldArgs,

        #[command(flatten)]
        thresholds: ThresholdArgs,

        /// 音声認識を使わずキーボード入力のみ
        #[arg(long)]
        typed: bool,
    },

    /// 番号を指定して出欠を記録
    Mark {
        /// 名簿JSONファイル
        #[arg(required = true)]
        roster: PathBuf,

        /// レコード番号（0始まり）
        #[arg(required = true)]
        index: usize,

        /// 欠席にする
        #[arg(long)]
        absent: bool,
    },

    /// 全員を未確認に戻す
    Reset {
        /// 名簿JSONファイル
        #[arg(required = true)]
        roster: PathBuf,
    },

    /// 出欠の集計を表示
    Stats {
        /// 名簿JSONファイル
        #[arg(required = true)]
        roster: PathBuf,
    },

    /// 出欠表をJSONで出力
    Export {
        /// 名簿JSONファイル
        #[arg(required = true)]
        roster: PathBuf,

        /// 出力ファイル（デフォルト: 名簿と同じフォルダの pointage.json）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 氏名列の判定結果を表示
    Fields {
        /// 名簿JSONファイル
        #[arg(required = true)]
        roster: PathBuf,
    },

    /// 設定を表示/編集
    Config {
        /// 照合の閾値を設定
        #[arg(long)]
        set_threshold: Option<u8>,

        /// 自動確定の閾値を設定
        #[arg(long)]
        set_auto_threshold: Option<u8>,

        /// 音声認識の言語を設定
        #[arg(long)]
        set_language: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },

    /// セッション記録の管理
    Session {
        /// 名簿JSONファイル
        #[arg(required = true)]
        roster: PathBuf,

        /// セッション記録を削除
        #[arg(long)]
        clear: bool,
    },
}
