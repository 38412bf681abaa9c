use anima_core::{AnimaConfig, Dimension, Trait};
use anima_limbic::{now_ms, AffectEngine, EngineState, Stimulus};
use anima_memory::{JsonFileStore, StateStore};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "anima", author, version, about = "Personality-modulated affect engine", long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, env = "ANIMA_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the state file (overrides config)
    #[arg(short, long)]
    state: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a summary of the current state without saving
    Status {
        /// Print the whole state document instead of the summary
        #[arg(long)]
        full: bool,
    },
    /// Apply an emotion label as a stimulus
    Feel {
        label: String,
        #[arg(short, long, default_value_t = 0.5)]
        intensity: f32,
        #[arg(short, long, default_value = "")]
        trigger: String,
    },
    /// Apply decay for the time elapsed since the last update
    Decay,
    /// Advance rumination by one tick
    Ruminate,
    /// Reset dimensions to baseline (all of them, plus emotions and rumination, when none are named)
    Reset { dimensions: Vec<String> },
    /// Override one dimension
    SetDimension {
        name: String,
        #[arg(allow_negative_numbers = true)]
        value: f32,
    },
    /// Nudge one dimension by a delta
    Nudge {
        name: String,
        #[arg(allow_negative_numbers = true)]
        delta: f32,
    },
    /// Change one personality trait and re-derive baseline and rates
    SetTrait { name: String, value: f32 },
}

/// A state-changing command with every name already resolved.
#[derive(Debug, Clone, PartialEq)]
enum Mutation {
    Feel {
        label: String,
        intensity: f32,
        trigger: String,
    },
    Decay,
    Ruminate,
    Reset(Option<Vec<Dimension>>),
    SetDimension(Dimension, f32),
    Nudge(Dimension, f32),
    SetTrait(Trait, f32),
}

impl Mutation {
    /// `None` for read-only commands. Unknown names fail here, before the
    /// lock is taken.
    fn from_command(command: Command) -> anyhow::Result<Option<Self>> {
        let mutation = match command {
            Command::Status { .. } => return Ok(None),
            Command::Feel {
                label,
                intensity,
                trigger,
            } => Mutation::Feel {
                label,
                intensity,
                trigger,
            },
            Command::Decay => Mutation::Decay,
            Command::Ruminate => Mutation::Ruminate,
            Command::Reset { dimensions } if dimensions.is_empty() => Mutation::Reset(None),
            Command::Reset { dimensions } => Mutation::Reset(Some(
                dimensions
                    .iter()
                    .map(|d| d.parse::<Dimension>())
                    .collect::<Result<_, _>>()?,
            )),
            Command::SetDimension { name, value } => Mutation::SetDimension(name.parse()?, value),
            Command::Nudge { name, delta } => Mutation::Nudge(name.parse()?, delta),
            Command::SetTrait { name, value } => Mutation::SetTrait(name.parse()?, value),
        };
        Ok(Some(mutation))
    }

    fn apply(&self, engine: &AffectEngine, state: &EngineState, now: i64) -> EngineState {
        match self {
            Mutation::Feel {
                label,
                intensity,
                trigger,
            } => {
                let decayed = engine.apply_decay_at(state, now);
                let stimulus = Stimulus::new(label.clone(), *intensity).with_trigger(trigger.clone());
                let stimulated = engine.apply_stimulus_at(&decayed, &stimulus, now);
                engine.advance_rumination_at(&stimulated, now)
            }
            Mutation::Decay => engine.apply_decay_at(state, now),
            Mutation::Ruminate => engine.advance_rumination_at(state, now),
            Mutation::Reset(dims) => engine.reset_to_baseline(state, dims.as_deref()),
            Mutation::SetDimension(dim, value) => engine.set_dimension(state, *dim, *value),
            Mutation::Nudge(dim, delta) => engine.apply_dimension_delta(state, *dim, *delta),
            Mutation::SetTrait(t, value) => engine.set_personality_trait(state, *t, *value),
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("anima")
        .join("config.toml")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let mut config = AnimaConfig::load_if_exists(&config_path)?;
    if let Some(state) = args.state.clone() {
        config.storage.state_path = state;
    }

    let engine = AffectEngine::new(config.clone())?;
    let store = JsonFileStore::from_config(&config)?;
    let now = now_ms();

    match args.command {
        Command::Status { full } => {
            let state = engine.apply_decay_at(&engine.reconcile(&store.load().await), now);
            if full {
                println!("{}", serde_json::to_string_pretty(&state)?);
            } else {
                println!("{}", serde_json::to_string_pretty(&state.summary())?);
            }
        }
        command => {
            if let Some(mutation) = Mutation::from_command(command)? {
                let state = store
                    .transact(|s| mutation.apply(&engine, &engine.reconcile(&s), now))
                    .await?;
                info!("Saved state to {}", store.path().display());
                println!("{}", serde_json::to_string_pretty(&state.summary())?);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_is_read_only() {
        let m = Mutation::from_command(Command::Status { full: false }).unwrap();
        assert!(m.is_none());
    }

    #[test]
    fn test_reset_resolves_dimensions() {
        let all = Mutation::from_command(Command::Reset { dimensions: vec![] }).unwrap();
        assert_eq!(all, Some(Mutation::Reset(None)));

        let some = Mutation::from_command(Command::Reset {
            dimensions: vec!["Trust".into(), "arousal".into()],
        })
        .unwrap();
        assert_eq!(
            some,
            Some(Mutation::Reset(Some(vec![Dimension::Trust, Dimension::Arousal])))
        );
    }

    #[test]
    fn test_unknown_names_rejected() {
        let err = Mutation::from_command(Command::SetDimension {
            name: "valence".into(),
            value: 0.2,
        })
        .unwrap_err();
        assert!(err.to_string().contains("valence"));

        assert!(Mutation::from_command(Command::SetTrait {
            name: "honesty".into(),
            value: 0.2,
        })
        .is_err());
        assert!(Mutation::from_command(Command::Reset {
            dimensions: vec!["pleasure".into(), "mood".into()],
        })
        .is_err());
    }

    #[test]
    fn test_feel_decays_then_applies() {
        let engine = AffectEngine::default();
        let state = engine.new_state_at(0);
        let m = Mutation::Feel {
            label: "happy".into(),
            intensity: 0.5,
            trigger: "sunshine".into(),
        };
        let next = m.apply(&engine, &state, 3_600_000);
        assert_eq!(next.last_updated, 3_600_000);
        assert_eq!(next.meta.total_updates, 1);
        assert_eq!(next.stimulus_history[0].trigger, "sunshine");
        assert!(next.basic_emotions.happiness > 0.0);
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from(["anima", "--state", "/tmp/s.json", "nudge", "pleasure", "-0.3"]).unwrap();
        assert_eq!(args.state, Some(PathBuf::from("/tmp/s.json")));
        match args.command {
            Command::Nudge { name, delta } => {
                assert_eq!(name, "pleasure");
                assert!((delta + 0.3).abs() < 1e-6);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
