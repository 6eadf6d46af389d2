use anyhow::Result;
use rtc::datachannel::data_channel::{DataChannelConfig, DataChannelMessage, DataChannelState};
use rtc::datachannel::dispatcher::{
    BoxFuture, DataChannelDispatcher, DataChannelHandler, DispatcherConfig,
};
use rtc::datachannel::payload::{Payload, PayloadProtocolIdentifier};
use rtc::shared::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Echo answers every string message with its uppercase version.
struct Echo {
    dispatcher: tokio::sync::OnceCell<Arc<DataChannelDispatcher>>,
}

impl DataChannelHandler for Echo {
    fn on_message(&self, stream_id: u16, payload: Payload) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let Payload::String(text) = payload else {
                return;
            };
            let Some(dispatcher) = self.dispatcher.get() else {
                return;
            };
            let reply = String::from_utf8_lossy(&text).to_uppercase();
            if let Err(err) = dispatcher.send(stream_id, Payload::from(reply)).await {
                log::warn!("echo failed: {err}");
            }
        })
    }
}

struct Collect(mpsc::UnboundedSender<(u16, Payload)>);

impl DataChannelHandler for Collect {
    fn on_message(&self, stream_id: u16, payload: Payload) -> BoxFuture<'_, ()> {
        let _ = self.0.send((stream_id, payload));
        Box::pin(async {})
    }
}

/// carry forwards one side's outbound messages to the other side, the way
/// the SCTP association would.
fn carry(
    mut outbound: mpsc::Receiver<DataChannelMessage>,
    to: Arc<DataChannelDispatcher>,
    handler: Arc<dyn DataChannelHandler>,
) {
    tokio::spawn(async move {
        while let Some(msg) = outbound.recv().await {
            let result = if msg.ppi == PayloadProtocolIdentifier::Dcep
                && to.state(msg.stream_id).is_none()
            {
                to.accept(msg, Arc::clone(&handler)).await
            } else {
                to.handle_inbound(msg).await
            };
            if let Err(err) = result {
                log::warn!("carry: {err}");
            }
        }
    });
}

#[tokio::test]
async fn test_data_channel_echo() -> Result<()> {
    env_logger::builder().is_test(true).try_init().ok();

    let (offerer, offerer_out) = DataChannelDispatcher::new(DispatcherConfig::default());
    let (answerer, answerer_out) = DataChannelDispatcher::new(DispatcherConfig::default());
    let (offerer, answerer) = (Arc::new(offerer), Arc::new(answerer));

    let (tx, mut replies) = mpsc::unbounded_channel();
    let collect: Arc<dyn DataChannelHandler> = Arc::new(Collect(tx));
    let echo = Arc::new(Echo {
        dispatcher: tokio::sync::OnceCell::new(),
    });
    let _ = echo.dispatcher.set(Arc::clone(&answerer));

    carry(offerer_out, Arc::clone(&answerer), echo);
    carry(answerer_out, Arc::clone(&offerer), Arc::clone(&collect));

    for (stream_id, label) in [(0u16, "chat"), (2, "telemetry")] {
        offerer
            .dial(
                DataChannelConfig {
                    label: label.to_owned(),
                    ..Default::default()
                },
                stream_id,
                Arc::clone(&collect),
            )
            .await?;
    }

    // wait for the ACKs
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while offerer.state(0) != Some(DataChannelState::Open)
        || offerer.state(2) != Some(DataChannelState::Open)
    {
        assert!(tokio::time::Instant::now() < deadline, "channels should open");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(answerer.config(2)?.label, "telemetry");
    assert_eq!(answerer.stream_ids()?, vec![0, 2]);

    offerer.send(0, Payload::from("ping")).await?;
    offerer.send(2, Payload::from("cpu 42")).await?;
    offerer.send(0, Payload::from("pong?")).await?;

    let mut chat = vec![];
    let mut telemetry = vec![];
    while chat.len() + telemetry.len() < 3 {
        let (stream_id, payload) = tokio::time::timeout(Duration::from_secs(2), replies.recv())
            .await?
            .ok_or_else(|| anyhow::anyhow!("collector gone"))?;
        match stream_id {
            0 => chat.push(payload),
            _ => telemetry.push(payload),
        }
    }
    assert_eq!(chat, vec![Payload::from("PING"), Payload::from("PONG?")]);
    assert_eq!(telemetry, vec![Payload::from("CPU 42")]);

    offerer.close(0)?;
    assert_eq!(
        offerer.send(0, Payload::from("bye")).await,
        Err(Error::ErrDataChannelClosed)
    );
    answerer.handle_reset(0)?;
    assert_eq!(answerer.stream_ids()?, vec![2]);

    Ok(())
}
