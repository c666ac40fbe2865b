//! Backend detection and façade construction

use std::sync::Arc;

use async_trait::async_trait;
use spacesync_config::{BackendKind, Config};
use tracing::{debug, info, warn};

use super::aerospace::AerospaceProvider;
use super::yabai::{YabaiClient, YabaiProvider};
use super::{AnyProvider, CommandRunner};
use crate::model::IconCache;

/// Process names probed during auto-detection, in priority order
const KNOWN_BACKENDS: &[(&str, BackendKind)] = &[
    ("yabai", BackendKind::Yabai),
    ("AeroSpace", BackendKind::Aerospace),
];

/// Answers whether a process with an exact name is running
#[async_trait]
pub trait ProcessProbe: Send + Sync {
    async fn is_running(&self, name: &str) -> bool;
}

/// Checks process names with `pgrep -x`
pub struct PgrepProbe {
    runner: Arc<dyn CommandRunner>,
}

impl PgrepProbe {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl ProcessProbe for PgrepProbe {
    async fn is_running(&self, name: &str) -> bool {
        // pgrep exits 1 when nothing matches
        self.runner.run("pgrep", &["-x", name]).await.is_ok()
    }
}

/// First known window manager found running
pub async fn detect_backend(probe: &dyn ProcessProbe) -> Option<BackendKind> {
    for (process, kind) in KNOWN_BACKENDS {
        if probe.is_running(process).await {
            debug!(process, backend = %kind, "Detected running window manager");
            return Some(*kind);
        }
    }
    None
}

/// Build the façade for a concrete backend kind
///
/// Returns `None` for [`BackendKind::Auto`], which must be resolved first.
pub fn create_provider(
    kind: BackendKind,
    config: &Config,
    runner: Arc<dyn CommandRunner>,
    icons: Option<Arc<dyn IconCache>>,
) -> Option<AnyProvider> {
    let provider = match kind {
        BackendKind::Auto => return None,
        BackendKind::Yabai => {
            let client = YabaiClient::new(runner, config.yabai.binary.clone(), icons);
            let yabai = Arc::new(YabaiProvider::new(client, config.yabai.socket_path.clone()));
            AnyProvider::new(kind, yabai.clone())
                .with_focus_awareness(yabai.clone())
                .with_focus_control(yabai.clone())
                .with_events(yabai)
        }
        BackendKind::Aerospace => {
            let aerospace = Arc::new(AerospaceProvider::new(
                runner,
                config.aerospace.binary.clone(),
                icons,
            ));
            AnyProvider::new(kind, aerospace.clone())
                .with_focus_awareness(aerospace.clone())
                .with_focus_control(aerospace)
        }
    };

    Some(provider.with_focus_settle(config.backend.focus_settle()))
}

/// Pick the configured backend, detecting it when set to `auto`
///
/// `None` means no supported window manager is running; the synchronizer
/// then stays permanently empty.
pub async fn resolve_provider(
    config: &Config,
    runner: Arc<dyn CommandRunner>,
    probe: &dyn ProcessProbe,
    icons: Option<Arc<dyn IconCache>>,
) -> Option<AnyProvider> {
    let kind = match config.backend.kind {
        BackendKind::Auto => match detect_backend(probe).await {
            Some(kind) => kind,
            None => {
                warn!("No supported window manager running (looked for yabai and AeroSpace)");
                return None;
            }
        },
        forced => forced,
    };

    info!(backend = %kind, "Using window manager backend");
    create_provider(kind, config, runner, icons)
}
