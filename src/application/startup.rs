use crate::application::provision::Provisioner;
use crate::application::serve::serve;
use crate::domain::error::BridgeError;
use crate::domain::model::{LanguagePair, StatusEvent};
use crate::domain::traits::{PackageRepository, StatusReporter};
use crate::interfaces::protocol::ProtocolWriter;
use crate::state::AppState;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{error, info};

pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_INTERRUPTED: i32 = 130;

/// Report a fatal startup error on the protocol channel.
pub async fn fail<W>(out: &mut ProtocolWriter<W>, message: String) -> i32
where
    W: AsyncWrite + Unpin + Send,
{
    error!("Startup failed: {}", message);
    if let Err(e) = out.report(StatusEvent::Error(message)).await {
        error!("Could not report startup failure: {}", e);
    }
    EXIT_FAILURE
}

/// Full process lifecycle in protocol mode; returns the exit code.
pub async fn run<R, W>(state: &AppState, input: R, out: &mut ProtocolWriter<W>) -> i32
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send,
{
    let pair = match state.config.language_pair() {
        Ok(pair) => pair,
        Err(e) => return fail(out, e.to_string()).await,
    };

    let repository = match state.open_repository().await {
        Ok(repository) => repository,
        Err(e) => return fail(out, e.to_string()).await,
    };
    info!("Package data in {}", repository.data_dir().display());

    run_with(repository, pair, input, out).await
}

/// Provision, announce readiness, then serve until input ends.
pub async fn run_with<P, R, W>(
    repository: P,
    pair: LanguagePair,
    input: R,
    out: &mut ProtocolWriter<W>,
) -> i32
where
    P: PackageRepository,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send,
{
    let provisioner = Provisioner::new(repository, pair);

    let engine = match provisioner.acquire(out).await {
        Ok(engine) => engine,
        // NotFound renders as "Model not found"
        Err(e) => return fail(out, e.to_string()).await,
    };

    if let Err(e) = out.report(StatusEvent::Ready).await {
        error!("Could not announce readiness: {}", e);
        return EXIT_FAILURE;
    }
    info!("Ready to translate {}", engine.pair());

    match serve(engine.as_ref(), input, out).await {
        Ok(_) => EXIT_OK,
        Err(BridgeError::Io(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {
            info!("Output closed by parent");
            EXIT_FAILURE
        }
        Err(e) => {
            error!("Protocol loop aborted: {}", e);
            EXIT_FAILURE
        }
    }
}
