use std::future::{self, Future};
use tokio_util::sync::CancellationToken;

#[cfg(target_family = "unix")]
fn unix_signal(kind: tokio::signal::unix::SignalKind) -> impl Future<Output = ()> {
    let signal = tokio::signal::unix::signal(kind);

    async move {
        match signal {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                warn!(?error, ?kind, "couldn't install signal handler");
                future::pending::<()>().await;
            }
        }
    }
}

/// Resolves once SIGINT, SIGTERM or SIGQUIT is received
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(?error, "couldn't listen for ctrl-c");
            future::pending::<()>().await;
        }
    };

    #[cfg(target_family = "unix")]
    let second_signal = {
        use tokio::signal::unix::SignalKind;

        let terminate = unix_signal(SignalKind::terminate());
        let quit = unix_signal(SignalKind::quit());

        async move {
            tokio::select! {
                () = terminate => (),
                () = quit => (),
            }
        }
    };
    #[cfg(not(target_family = "unix"))]
    let second_signal = future::pending::<()>();

    tokio::select! {
        () = ctrl_c => (),
        () = second_signal => (),
    }

    info!("received shutdown signal");
}

#[derive(Clone)]
pub struct Receiver {
    inner: CancellationToken,
}

impl Receiver {
    /// Receiver that only resolves once [`Receiver::trigger`] is called
    #[must_use]
    pub fn manual() -> Self {
        Self {
            inner: CancellationToken::new(),
        }
    }

    pub fn trigger(&self) {
        self.inner.cancel();
    }

    pub async fn wait(self) {
        self.inner.cancelled_owned().await;
    }
}

/// Spawn a task listening for the process' shutdown signals
#[must_use]
pub fn shutdown() -> Receiver {
    let receiver = Receiver::manual();

    tokio::spawn({
        let receiver = receiver.clone();

        async move {
            shutdown_signal().await;
            receiver.trigger();
        }
    });

    receiver
}

#[cfg(test)]
mod test {
    use super::Receiver;
    use std::time::Duration;

    #[tokio::test]
    async fn manual_trigger() {
        let receiver = Receiver::manual();
        receiver.trigger();

        tokio::time::timeout(Duration::from_secs(1), receiver.wait())
            .await
            .expect("receiver didn't resolve");
    }
}
