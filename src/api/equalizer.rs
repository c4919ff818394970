//! Typed equalizer operations
//!
//! Each operation validates its arguments, encodes them, sends exactly one
//! command and decodes the reply. Invalid arguments fail with
//! `InvalidArgument` before anything is sent. Setters succeed only when the
//! host answers `1`.

use tracing::{debug, instrument};

use super::channels::Command;
use super::codec;
use crate::error::{AquaError, ErrorCode, Result};
use crate::ipc::{CommandChannel, ReplyPayload};
use crate::state::{
    check_frequency, check_gain, check_quality, EqualizerState, FilterType, MAX_NUM_FILTERS,
    MIN_NUM_FILTERS,
};

pub struct EqualizerApi {
    channel: CommandChannel,
}

impl EqualizerApi {
    pub fn new(channel: CommandChannel) -> Self {
        Self { channel }
    }

    pub fn channel(&self) -> &CommandChannel {
        &self.channel
    }

    /// Fetch the full state; an invalid state is reported as `UNKNOWN`
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<EqualizerState> {
        let payload = self.channel.invoke(Command::HealthCheck.channel(None), vec![]).await;
        let state = payload.into_state().map_err(AquaError::from)?;
        if let Err(e) = state.validate() {
            debug!(error = %e, "health check returned an invalid state");
            return Err(ErrorCode::Unknown.into());
        }
        Ok(state)
    }

    pub async fn get_enable(&self) -> Result<bool> {
        self.get(Command::GetEnable, None).await.map(codec::decode_bool)
    }

    pub async fn set_enable(&self, value: bool) -> Result<()> {
        self.set(Command::SetEnable, None, codec::encode_bool(value)).await
    }

    pub async fn set_auto_preamp(&self, value: bool) -> Result<()> {
        self.set(Command::SetAutoPreAmp, None, codec::encode_bool(value)).await
    }

    pub async fn get_preamp(&self) -> Result<f64> {
        self.get(Command::GetPreAmp, None).await.map(codec::decode_gain)
    }

    pub async fn set_preamp(&self, value: f64) -> Result<()> {
        check_gain(value)?;
        self.set(Command::SetPreAmp, None, codec::encode_gain(value)).await
    }

    pub async fn get_gain(&self, index: usize) -> Result<f64> {
        check_index(index)?;
        self.get(Command::GetFilterGain, Some(index)).await.map(codec::decode_gain)
    }

    pub async fn set_gain(&self, index: usize, value: f64) -> Result<()> {
        check_index(index)?;
        check_gain(value)?;
        self.set(Command::SetFilterGain, Some(index), codec::encode_gain(value)).await
    }

    pub async fn get_frequency(&self, index: usize) -> Result<f64> {
        check_index(index)?;
        self.get(Command::GetFilterFrequency, Some(index))
            .await
            .map(codec::decode_frequency)
    }

    pub async fn set_frequency(&self, index: usize, value: f64) -> Result<()> {
        check_index(index)?;
        check_frequency(value)?;
        self.set(Command::SetFilterFrequency, Some(index), codec::encode_frequency(value))
            .await
    }

    pub async fn get_quality(&self, index: usize) -> Result<f64> {
        check_index(index)?;
        self.get(Command::GetFilterQuality, Some(index))
            .await
            .map(codec::decode_quality)
    }

    pub async fn set_quality(&self, index: usize, value: f64) -> Result<()> {
        check_index(index)?;
        check_quality(value)?;
        self.set(Command::SetFilterQuality, Some(index), codec::encode_quality(value))
            .await
    }

    pub async fn get_type(&self, index: usize) -> Result<FilterType> {
        check_index(index)?;
        let raw = self.get(Command::GetFilterType, Some(index)).await?;
        codec::decode_type(raw).ok_or_else(|| ErrorCode::Unknown.into())
    }

    pub async fn set_type(&self, index: usize, value: FilterType) -> Result<()> {
        check_index(index)?;
        self.set(Command::SetFilterType, Some(index), codec::encode_type(value)).await
    }

    /// A count outside the band limits is reported as `UNKNOWN`
    pub async fn get_band_count(&self) -> Result<usize> {
        let raw = self.get(Command::GetFilterCount, None).await?;
        usize::try_from(raw)
            .ok()
            .filter(|n| (MIN_NUM_FILTERS..=MAX_NUM_FILTERS).contains(n))
            .ok_or_else(|| ErrorCode::Unknown.into())
    }

    /// Append a band at `frequency` on the host
    pub async fn add_band(&self, frequency: f64) -> Result<()> {
        check_frequency(frequency)?;
        let args = vec![codec::encode_frequency(frequency)];
        self.expect_ack(Command::AddFilter, None, args).await
    }

    pub async fn remove_band(&self, index: usize) -> Result<()> {
        check_index(index)?;
        self.expect_ack(Command::RemoveFilter, Some(index), vec![index as i64])
            .await
    }

    // ========================================================================
    // Plumbing
    // ========================================================================

    async fn get(&self, command: Command, index: Option<usize>) -> Result<u64> {
        let args = index.map(|i| vec![i as i64]).unwrap_or_default();
        self.channel
            .invoke(command.channel(index), args)
            .await
            .into_value()
            .map_err(AquaError::from)
    }

    async fn set(&self, command: Command, index: Option<usize>, value: i64) -> Result<()> {
        let mut args: Vec<i64> = index.map(|i| vec![i as i64]).unwrap_or_default();
        args.push(value);
        self.expect_ack(command, index, args).await
    }

    async fn expect_ack(&self, command: Command, index: Option<usize>, args: Vec<i64>) -> Result<()> {
        match self.channel.invoke(command.channel(index), args).await {
            ReplyPayload::Value(1) => Ok(()),
            ReplyPayload::Error(code) => Err(code.into()),
            other => {
                debug!(%command, reply = ?other, "setter not acknowledged");
                Err(ErrorCode::Unknown.into())
            }
        }
    }
}

fn check_index(index: usize) -> Result<()> {
    if index >= MAX_NUM_FILTERS {
        return Err(AquaError::InvalidArgument {
            param: "index",
            value: index as f64,
            expected: format!("0 to {}", MAX_NUM_FILTERS - 1),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::{CommandEnvelope, Inbox, Transport};
    use crate::state::Filter;
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Answers every command with a fixed body and records what was sent
    struct Canned {
        inbox: Inbox,
        body: Value,
        sent: Mutex<Vec<CommandEnvelope>>,
    }

    impl Transport for Canned {
        fn send(&self, envelope: CommandEnvelope) {
            self.inbox.deliver(envelope.reply(self.body.clone()));
            self.sent.lock().unwrap().push(envelope);
        }
    }

    fn canned(body: Value) -> (EqualizerApi, Arc<Canned>) {
        let inbox = Inbox::new();
        let transport = Arc::new(Canned {
            inbox: inbox.clone(),
            body,
            sent: Mutex::new(Vec::new()),
        });
        let channel = CommandChannel::new(transport.clone(), inbox, Duration::from_secs(10));
        (EqualizerApi::new(channel), transport)
    }

    #[tokio::test]
    async fn test_set_gain_encodes_thousandths() {
        let (api, transport) = canned(json!({"result": 1}));
        api.set_gain(3, -10.5).await.unwrap();

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].channel, "setFilterGain:3");
        assert_eq!(sent[0].args, vec![3, -10_500]);
    }

    #[tokio::test]
    async fn test_invalid_argument_sends_nothing() {
        let (api, transport) = canned(json!({"result": 1}));

        let err = api.set_gain(0, 45.0).await.unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ARGUMENT");
        assert!(api.set_quality(0, 0.0).await.is_err());
        assert!(api.set_frequency(0, 5.0).await.is_err());
        assert!(api.set_preamp(f64::NAN).await.is_err());
        assert!(api.get_gain(MAX_NUM_FILTERS).await.is_err());

        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_setter_requires_ack_of_one() {
        let (api, _) = canned(json!({"result": 0}));
        let err = api.set_enable(true).await.unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN");
    }

    #[tokio::test]
    async fn test_error_code_is_surfaced() {
        let (api, _) = canned(json!({"errorCode": "NOT_INSTALLED"}));
        let err = api.get_preamp().await.unwrap_err();
        assert_eq!(err, AquaError::from(ErrorCode::NotInstalled));
    }

    #[tokio::test]
    async fn test_getters_decode() {
        let (api, _) = canned(json!({"result": 4_294_956_796u64}));
        assert_eq!(api.get_gain(0).await.unwrap(), -10.5);

        let (api, _) = canned(json!({"result": 2}));
        assert_eq!(api.get_type(1).await.unwrap(), FilterType::HighPassQ);
        assert_eq!(api.get_band_count().await.unwrap(), 2);
        assert!(api.get_enable().await.unwrap());

        let (api, _) = canned(json!({"result": 99}));
        assert_eq!(api.get_type(0).await.unwrap_err().error_code(), "UNKNOWN");
        assert_eq!(api.get_band_count().await.unwrap_err().error_code(), "UNKNOWN");

        let (api, _) = canned(json!({"result": 0}));
        assert_eq!(api.get_band_count().await.unwrap_err().error_code(), "UNKNOWN");
    }

    #[tokio::test]
    async fn test_health_check_rejects_invalid_state() {
        let mut state = EqualizerState::default();
        state.pre_amp = 99.0;
        let (api, _) = canned(ReplyPayload::state(&state));
        assert_eq!(api.health_check().await.unwrap_err().error_code(), "UNKNOWN");

        let expected = EqualizerState::default();
        let (api, _) = canned(ReplyPayload::state(&expected));
        assert_eq!(api.health_check().await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_health_check_rejects_duplicate_ids() {
        let mut state = EqualizerState::default();
        let shared = state.filters.ids()[0];
        state.filters = vec![
            Filter::with_frequency(shared, 100.0),
            Filter::with_frequency(shared, 5000.0),
        ]
        .into();

        let (api, _) = canned(ReplyPayload::state(&state));
        assert_eq!(api.health_check().await.unwrap_err().error_code(), "UNKNOWN");
    }

    #[tokio::test]
    async fn test_health_check_needs_state_reply() {
        let (api, _) = canned(json!({"result": 1}));
        assert_eq!(api.health_check().await.unwrap_err().error_code(), "UNKNOWN");
    }

    #[tokio::test]
    async fn test_add_and_remove_args() {
        let (api, transport) = canned(json!({"result": 1}));
        api.add_band(2500.0).await.unwrap();
        api.remove_band(4).await.unwrap();

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent[0].channel, "addFilter");
        assert_eq!(sent[0].args, vec![2500]);
        assert_eq!(sent[1].channel, "removeFilter:4");
        assert_eq!(sent[1].args, vec![4]);
    }
}
