use chrono::Utc;
use clap::Parser;
use ekho::{capture, cli, config, error, interactive, roster, store};
use cli::{Cli, Commands, NameFieldArgs};
use config::Config;
use ekho_common::{explain, resolve_name_field, AttendanceSession, MatchConfig};
use error::Result;
use std::path::Path;
use std::time::Duration;
use store::SessionSnapshot;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = Config::load()?;

    match cli.command {
        Commands::Check { roster, utterance, name, thresholds, explain: explain_scores } => {
            let matching = config.matching_with(thresholds.threshold, thresholds.auto_threshold)?;
            let (session, _) = open(&roster, &name, matching)?;
            let spec = session.require_name_field()?;

            println!("🔍 「{}」を照合（氏名列: {}）\n", utterance, spec);
            let candidates = session.rank(&utterance)?;
            if candidates.is_empty() {
                println!("❌ 閾値 {} 以上の候補はありません", session.config().threshold);
                return Ok(());
            }

            for candidate in &candidates {
                let auto = if candidate.score >= session.config().auto_threshold { " ★自動確定" } else { "" };
                println!("  #{:<4} {:<30} {:>3}{}", candidate.record_index, candidate.display_name, candidate.score, auto);
                if explain_scores {
                    if let Some((variant, b)) = explain(&utterance, &candidate.display_name, session.config()) {
                        println!(
                            "        「{}」: ratio {} / partial {} / sort {} / set {} / 網羅 +{} / 前方一致 +{}",
                            variant.text, b.ratio, b.partial, b.token_sort, b.token_set, b.coverage_bonus, b.prefix_bonus
                        );
                    }
                }
            }
        }

        Commands::Listen { roster, name, thresholds, typed } => {
            println!("📋 ekho - 点呼\n");
            let matching = config.matching_with(thresholds.threshold, thresholds.auto_threshold)?;
            let (mut session, restored) = open(&roster, &name, matching)?;
            session.require_name_field()?;
            println!("✔ {}名を読み込み（前回の記録 {}件を適用）", session.roster().len(), restored);

            let chain = if typed {
                capture::FallbackChain::new().with(capture::TypedTranscriber::new())
            } else {
                capture::build_chain(
                    &config.transcribers,
                    &config.language,
                    Duration::from_secs(config.listen_timeout_seconds),
                )?
            };

            interactive::run_listen(&roster, &mut session, &chain).await?;
            println!("\n✅ 記録を保存: {}", SessionSnapshot::snapshot_path(&roster).display());
        }

        Commands::Mark { roster, index, absent } => {
            let (mut session, _) = open(&roster, &NameFieldArgs::default(), config.matching.clone())?;
            if absent {
                session.reject(index, Utc::now())?;
            } else {
                session.confirm(index, Utc::now())?;
            }
            SessionSnapshot::capture(&session).save(&roster)?;

            let name = session.display_name(index).unwrap_or_else(|| format!("#{}", index));
            println!("✔ {} を{}にしました", name, if absent { "欠席" } else { "出席" });
        }

        Commands::Reset { roster } => {
            let (mut session, _) = open(&roster, &NameFieldArgs::default(), config.matching.clone())?;
            session.reset_all();
            SessionSnapshot::capture(&session).save(&roster)?;
            println!("✔ {}名を未確認に戻しました", session.roster().len());
        }

        Commands::Stats { roster } => {
            let (session, _) = open(&roster, &NameFieldArgs::default(), config.matching.clone())?;
            let stats = session.stats();
            println!("出欠:");
            println!("  名簿: {}名", stats.total);
            println!("  出席: {}名", stats.present);
            println!("  欠席: {}名", stats.absent);
            println!("  出席率: {:.1}%", stats.rate * 100.0);
        }

        Commands::Export { roster, output } => {
            let (session, _) = open(&roster, &NameFieldArgs::default(), config.matching.clone())?;
            let output = output.unwrap_or_else(|| {
                roster.parent().unwrap_or_else(|| Path::new(".")).join("pointage.json")
            });
            roster::write_projection(&session, &output)?;
            println!("✔ 出欠表を保存: {}", output.display());
        }

        Commands::Fields { roster } => {
            let roster = roster::load_roster(&roster)?;
            println!("列: {}", roster.field_names.join(", "));
            match resolve_name_field(&roster.field_names) {
                Ok(spec) => println!("氏名列: {}", spec),
                Err(e) => println!("{}\n--name-field または --given/--family で指定してください", e),
            }
            if let Some(field) = ekho_common::ledger::find_presence_field(&roster.field_names) {
                println!("出席列: {}", field);
            }
        }

        Commands::Config { set_threshold, set_auto_threshold, set_language, show } => {
            let mut config = config;
            let changed = set_threshold.is_some() || set_auto_threshold.is_some() || set_language.is_some();

            if changed {
                config.matching = config.matching_with(set_threshold, set_auto_threshold)?;
                if let Some(language) = set_language {
                    config.language = language;
                }
                config.save()?;
                println!("✔ 設定を保存しました: {}", Config::config_path()?.display());
            }

            if show || !changed {
                println!("設定:");
                println!("  照合の閾値: {}", config.matching.threshold);
                println!("  自動確定の閾値: {}", config.matching.auto_threshold);
                println!("  言語: {}", config.language);
                println!("  待ち時間: {}秒", config.listen_timeout_seconds);
                println!("  文字起こし: {}件", config.transcribers.len());
            }
        }

        Commands::Session { roster, clear } => {
            let path = SessionSnapshot::snapshot_path(&roster);

            if clear {
                match SessionSnapshot::clear(&roster) {
                    Ok(true) => println!("✔ セッション記録を削除しました: {}", path.display()),
                    Ok(false) => println!("セッション記録が存在しません"),
                    Err(e) => println!("セッション記録の削除エラー: {}", e),
                }
            } else if path.exists() {
                let snapshot = SessionSnapshot::load(&roster);
                println!("セッション記録:");
                println!("  パス: {}", path.display());
                println!("  件数: {}", snapshot.len());
                if let Some(spec) = &snapshot.name_field {
                    println!("  氏名列: {}", spec);
                }
            } else {
                println!("セッション記録が存在しません: {}", path.display());
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "ekho=debug,ekho_common=debug" } else { "warn" })
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// 名簿を開き、コマンドラインの氏名列指定があれば反映する
fn open(path: &Path, name: &NameFieldArgs, matching: MatchConfig) -> Result<(AttendanceSession, usize)> {
    let (mut session, restored) = roster::open_session(path, matching)?;
    if let Some(spec) = name.to_spec()? {
        session.set_name_field(spec)?;
    }
    Ok((session, restored))
}
