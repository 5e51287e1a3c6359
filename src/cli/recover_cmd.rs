//! Recover command handler

use std::sync::Arc;

use crate::application::ports::RecoveryStore;
use crate::application::{RecoveryService, UploadCoordinator};
use crate::domain::config::AppConfig;
use crate::domain::recording::{Duration, SessionId};
use crate::domain::recovery::RetentionPolicy;

use super::app::{build_uploader, open_store};
use super::args::RecoverAction;
use super::presenter::Presenter;

/// Handle recover subcommand
pub async fn handle_recover_command(
    action: RecoverAction,
    config: &AppConfig,
    presenter: &mut Presenter,
) -> Result<(), String> {
    let store = open_store(config);
    let service = RecoveryService::new(Arc::clone(&store));

    match action {
        RecoverAction::List => {
            let recordings = service.list().await.map_err(|e| e.to_string())?;
            presenter.recovered_list(&recordings);
            Ok(())
        }
        RecoverAction::Upload { id, title } => {
            let id = resolve_id(&service, &id).await?;
            let coordinator = UploadCoordinator::new(build_uploader(config)?, store);

            presenter.start_spinner(&format!("Uploading {}...", id.short()));
            match coordinator.upload_recovered(&id, title.as_deref()).await {
                Ok(receipt) => {
                    presenter.spinner_success(&format!("Upload {} ({})", receipt.status, id.short()));
                    presenter.output(&receipt.transcription_id);
                    Ok(())
                }
                Err(e) => {
                    presenter.spinner_fail("Upload failed");
                    Err(e.to_string())
                }
            }
        }
        RecoverAction::Discard { id } => {
            let id = resolve_id(&service, &id).await?;
            service.discard(&id).await.map_err(|e| e.to_string())?;
            presenter.success(&format!("Discarded {}", id.short()));
            Ok(())
        }
        RecoverAction::Export { id, path } => {
            let id = resolve_id(&service, &id).await?;
            let recording = service.export(&id, &path).await.map_err(|e| e.to_string())?;
            presenter.success(&format!(
                "Exported {} ({}) to {}",
                id.short(),
                recording.duration_label(),
                path.display()
            ));
            Ok(())
        }
        RecoverAction::Prune { older_than } => {
            let max_age = match older_than {
                Some(value) => value
                    .parse::<Duration>()
                    .map_err(|e| format!("Invalid older-than: {}", e))?,
                None => config.retention_or_default(),
            };
            let removed = service
                .prune(&RetentionPolicy::new(max_age))
                .await
                .map_err(|e| e.to_string())?;
            presenter.success(&format!(
                "Removed {} recording(s) older than {}",
                removed.len(),
                max_age
            ));
            Ok(())
        }
    }
}

async fn resolve_id<S: RecoveryStore>(
    service: &RecoveryService<S>,
    input: &str,
) -> Result<SessionId, String> {
    let ids: Vec<SessionId> = service
        .list()
        .await
        .map_err(|e| e.to_string())?
        .into_iter()
        .map(|recording| recording.id)
        .collect();
    match_session(&ids, input)
}

/// Pick the session named by a full id or a unique prefix
fn match_session(ids: &[SessionId], input: &str) -> Result<SessionId, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("Session id must not be empty".to_string());
    }
    if let Some(exact) = ids.iter().find(|id| id.as_str() == input) {
        return Ok(exact.clone());
    }

    let matches: Vec<&SessionId> = ids
        .iter()
        .filter(|id| id.as_str().starts_with(input))
        .collect();
    match matches.as_slice() {
        [] => Err(format!("No recoverable recording matches '{}'", input)),
        [id] => Ok((*id).clone()),
        many => Err(format!(
            "'{}' matches {} recordings; use more characters of the id",
            input,
            many.len()
        )),
    }
}
