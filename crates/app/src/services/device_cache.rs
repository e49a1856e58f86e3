//! Device cache: in-memory device snapshots kept in sync with the hub.
//!
//! Attribute changes detected here become [`DeviceEvent`]s handed to the
//! [`DeviceEventDispatcher`]. Updates pushed by the hub are always announced,
//! even when the value did not change; reloads only announce real changes.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tripwire_domain::device::{Device, DeviceUpdate};
use tripwire_domain::error::NotFoundError;
use tripwire_domain::event::DeviceEvent;
use tripwire_domain::id::DeviceId;

use crate::dispatcher::DeviceEventDispatcher;
use crate::error::{DeviceCacheError, HubError};
use crate::ports::HubClient;

/// Device snapshots fed by a [`HubClient`].
pub struct DeviceCache<H> {
    hub: H,
    dispatcher: Arc<DeviceEventDispatcher>,
    devices: RwLock<BTreeMap<DeviceId, Device>>,
}

impl<H: HubClient> DeviceCache<H> {
    /// Create an empty cache; call [`reload_all`](Self::reload_all) to fill it.
    pub fn new(hub: H, dispatcher: Arc<DeviceEventDispatcher>) -> Self {
        Self {
            hub,
            dispatcher,
            devices: RwLock::new(BTreeMap::new()),
        }
    }

    /// Snapshot of one device.
    #[must_use]
    pub fn device(&self, id: DeviceId) -> Option<Device> {
        self.devices.read().get(&id).cloned()
    }

    /// Snapshots of every device, ordered by id.
    #[must_use]
    pub fn devices(&self) -> Vec<Device> {
        self.devices.read().values().cloned().collect()
    }

    #[must_use]
    pub fn contains(&self, id: DeviceId) -> bool {
        self.devices.read().contains_key(&id)
    }

    /// Reload every device the hub lists and drop the ones it no longer does.
    ///
    /// Returns the number of devices in the cache afterwards.
    ///
    /// # Errors
    ///
    /// Returns a [`DeviceCacheError`] when the hub fails or reports a device
    /// that cannot be parsed.
    #[tracing::instrument(skip(self))]
    pub async fn reload_all(&self) -> Result<usize, DeviceCacheError> {
        let summaries = self.hub.list_devices().await?;
        let mut fresh = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let id: DeviceId = summary.id.parse()?;
            match self.hub.device_info(id).await {
                Ok(info) => fresh.push(Device::try_from(info)?),
                Err(HubError::UnknownDevice(_)) => {
                    tracing::debug!(device_id = %id, "listed device vanished during reload");
                }
                Err(err) => return Err(err.into()),
            }
        }

        let reported: HashSet<DeviceId> = fresh.iter().map(|device| device.id).collect();
        let (events, count) = {
            let mut devices = self.devices.write();
            devices.retain(|id, _| {
                let keep = reported.contains(id);
                if !keep {
                    tracing::info!(device_id = %id, "device removed from hub");
                }
                keep
            });
            let mut events = Vec::new();
            for device in fresh {
                events.extend(store(&mut devices, device)?);
            }
            (events, devices.len())
        };

        tracing::info!(devices = count, changes = events.len(), "devices reloaded");
        self.announce(events).await;
        Ok(count)
    }

    /// Reload a single device.
    ///
    /// A device the hub does not know is removed from the cache and `None`
    /// is returned.
    ///
    /// # Errors
    ///
    /// Returns a [`DeviceCacheError`] when the hub fails or its data cannot
    /// be parsed.
    #[tracing::instrument(skip(self))]
    pub async fn reload_device(&self, id: DeviceId) -> Result<Option<Device>, DeviceCacheError> {
        let device = match self.hub.device_info(id).await {
            Ok(info) => Device::try_from(info)?,
            Err(HubError::UnknownDevice(_)) => {
                if self.devices.write().remove(&id).is_some() {
                    tracing::info!("device removed from hub");
                }
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        let (events, snapshot) = {
            let mut devices = self.devices.write();
            let events = store(&mut devices, device)?;
            (events, devices.get(&id).cloned())
        };
        self.announce(events).await;
        Ok(snapshot)
    }

    /// Apply an attribute update pushed by the hub.
    ///
    /// Unknown devices are reloaded first. The update is announced even if
    /// the value is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceCacheError::NotFound`] when the hub does not know the
    /// device either, or another error if it cannot be reached.
    #[tracing::instrument(skip_all, fields(device_id = %update.device_id, attribute = %update.name))]
    pub async fn apply_update(&self, update: DeviceUpdate) -> Result<(), DeviceCacheError> {
        let id: DeviceId = update.device_id.parse()?;
        if !self.contains(id) && self.reload_device(id).await?.is_none() {
            return Err(NotFoundError {
                entity: "Device",
                id: id.to_string(),
            }
            .into());
        }
        self.set_attribute(id, &update.name, update.value, true)
            .await
            .map(|_| ())
    }

    /// Set an attribute on a cached device and announce the change.
    ///
    /// Returns the announced event, or `None` when the value did not change
    /// and `force` is not set.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceCacheError::NotFound`] for a device not in the cache.
    pub async fn set_attribute(
        &self,
        id: DeviceId,
        attribute: &str,
        value: Option<String>,
        force: bool,
    ) -> Result<Option<DeviceEvent>, DeviceCacheError> {
        let event = {
            let mut devices = self.devices.write();
            let device = devices.get_mut(&id).ok_or_else(|| NotFoundError {
                entity: "Device",
                id: id.to_string(),
            })?;
            device.set_attribute(attribute, value, force)
        };
        if let Some(event) = &event {
            self.announce(vec![event.clone()]).await;
        }
        Ok(event)
    }

    /// Send a command to a cached device through the hub.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceCacheError::NotFound`] for a device not in the cache,
    /// or the hub's error.
    #[tracing::instrument(skip(self))]
    pub async fn send_command(
        &self,
        id: DeviceId,
        command: &str,
        value: Option<&str>,
    ) -> Result<(), DeviceCacheError> {
        if !self.contains(id) {
            return Err(NotFoundError {
                entity: "Device",
                id: id.to_string(),
            }
            .into());
        }
        self.hub.send_command(id, command, value).await?;
        Ok(())
    }

    /// Hand events to the dispatcher, one after the other.
    async fn announce(&self, events: Vec<DeviceEvent>) {
        for event in events {
            if let Err(err) = self.dispatcher.dispatch(&event.into()).await {
                tracing::warn!(error = %err, "device event dispatch reported failures");
            }
        }
    }
}

impl<H: HubClient + 'static> DeviceCache<H> {
    /// Reload every device on a fixed period, starting one period from now.
    pub fn spawn_periodic_reload(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                tracing::info!(every = ?every, "periodic device reload");
                if let Err(err) = cache.reload_all().await {
                    tracing::error!(error = %err, "periodic device reload failed");
                }
            }
        })
    }

    /// Apply every update received on `updates` until the channel closes.
    pub fn spawn_update_listener(
        self: &Arc<Self>,
        mut updates: mpsc::Receiver<DeviceUpdate>,
    ) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(update) = updates.recv().await {
                if let Err(err) = cache.apply_update(update).await {
                    tracing::warn!(error = %err, "device update dropped");
                }
            }
            tracing::debug!("device update stream closed");
        })
    }
}

/// Insert a new device or refresh an existing one; returns changes to announce.
fn store(
    devices: &mut BTreeMap<DeviceId, Device>,
    device: Device,
) -> Result<Vec<DeviceEvent>, DeviceCacheError> {
    match devices.get_mut(&device.id) {
        Some(existing) => Ok(existing.update_from(device, false)?),
        None => {
            tracing::info!(device_id = %device.id, label = %device.label, "device added");
            devices.insert(device.id, device);
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;

    use parking_lot::Mutex;
    use tripwire_domain::device::{DeviceInfo, DeviceSummary};
    use tripwire_domain::trigger::{Buildable, DeviceTrigger};

    use crate::automation::testing::{SpyAutomation, registered};
    use crate::ports::EventsService;

    // ── In-memory hub ──────────────────────────────────────────────

    #[derive(Default)]
    struct FakeHub {
        devices: Mutex<BTreeMap<String, DeviceInfo>>,
        commands: Mutex<Vec<(DeviceId, String, Option<String>)>>,
    }

    impl FakeHub {
        fn put(&self, id: &str, attributes: serde_json::Value) {
            let info = serde_json::from_value(serde_json::json!({
                "id": id,
                "name": format!("device {id}"),
                "label": format!("Device {id}"),
                "capabilities": ["Switch"],
                "attributes": attributes,
                "commands": ["on", "off"],
            }))
            .unwrap();
            self.devices.lock().insert(id.to_string(), info);
        }
    }

    impl HubClient for FakeHub {
        fn list_devices(&self) -> impl Future<Output = Result<Vec<DeviceSummary>, HubError>> + Send {
            let list = self
                .devices
                .lock()
                .values()
                .map(|info| DeviceSummary {
                    id: info.id.clone(),
                    name: info.name.clone(),
                    label: info.label.clone(),
                })
                .collect();
            async move { Ok(list) }
        }

        fn device_info(&self, id: DeviceId) -> impl Future<Output = Result<DeviceInfo, HubError>> + Send {
            let info = self.devices.lock().get(&id.to_string()).cloned();
            async move { info.ok_or(HubError::UnknownDevice(id)) }
        }

        fn send_command(
            &self,
            id: DeviceId,
            command: &str,
            value: Option<&str>,
        ) -> impl Future<Output = Result<(), HubError>> + Send {
            self.commands
                .lock()
                .push((id, command.to_string(), value.map(str::to_string)));
            async { Ok(()) }
        }
    }

    fn switch(value: &str) -> serde_json::Value {
        serde_json::json!([{"name": "switch", "currentValue": value, "dataType": "ENUM"}])
    }

    fn setup() -> (Arc<FakeHub>, Arc<DeviceEventDispatcher>, Arc<DeviceCache<Arc<FakeHub>>>) {
        let hub = Arc::new(FakeHub::default());
        let dispatcher = Arc::new(DeviceEventDispatcher::new());
        let cache = Arc::new(DeviceCache::new(Arc::clone(&hub), Arc::clone(&dispatcher)));
        (hub, dispatcher, cache)
    }

    fn update(id: &str, name: &str, value: &str) -> DeviceUpdate {
        DeviceUpdate {
            device_id: id.to_string(),
            name: name.to_string(),
            value: Some(value.to_string()),
        }
    }

    #[tokio::test]
    async fn should_load_every_listed_device() {
        let (hub, _, cache) = setup();
        hub.put("1", switch("on"));
        hub.put("2", switch("off"));

        assert_eq!(cache.reload_all().await.unwrap(), 2);
        let device = cache.device(DeviceId::new(2)).unwrap();
        assert_eq!(device.attribute("switch"), Some("off"));
    }

    #[tokio::test]
    async fn should_drop_devices_the_hub_no_longer_lists() {
        let (hub, _, cache) = setup();
        hub.put("1", switch("on"));
        hub.put("2", switch("off"));
        cache.reload_all().await.unwrap();

        hub.devices.lock().remove("2");
        assert_eq!(cache.reload_all().await.unwrap(), 1);

        assert!(cache.contains(DeviceId::new(1)));
        assert!(!cache.contains(DeviceId::new(2)));
    }

    #[tokio::test]
    async fn should_announce_changes_found_on_reload() {
        let (hub, dispatcher, cache) = setup();
        let spy = SpyAutomation::new("watch", vec![DeviceTrigger::for_device(1).build()]);
        dispatcher.register_automation(registered(&spy)).unwrap();
        hub.put("1", switch("on"));
        cache.reload_all().await.unwrap();
        assert_eq!(spy.calls(), 0);

        hub.put("1", switch("off"));
        cache.reload_all().await.unwrap();
        cache.reload_all().await.unwrap();

        assert_eq!(spy.calls(), 1);
        let received = spy.received.lock();
        let event = received[0].as_device().unwrap();
        assert_eq!(event.previous_value.as_deref(), Some("on"));
        assert_eq!(event.new_value.as_deref(), Some("off"));
    }

    #[tokio::test]
    async fn should_announce_pushed_update_even_when_unchanged() {
        let (hub, dispatcher, cache) = setup();
        let spy = SpyAutomation::new(
            "switched_on",
            vec![DeviceTrigger::for_device(1).attribute("switch").is("on").build()],
        );
        dispatcher.register_automation(registered(&spy)).unwrap();
        hub.put("1", switch("on"));
        cache.reload_all().await.unwrap();

        cache.apply_update(update("1", "switch", "on")).await.unwrap();

        assert_eq!(spy.calls(), 1);
    }

    #[tokio::test]
    async fn should_reload_unknown_device_before_applying_update() {
        let (hub, _, cache) = setup();
        hub.put("7", switch("off"));

        cache.apply_update(update("7", "switch", "on")).await.unwrap();

        let device = cache.device(DeviceId::new(7)).unwrap();
        assert_eq!(device.attribute("switch"), Some("on"));
    }

    #[tokio::test]
    async fn should_return_not_found_for_device_missing_everywhere() {
        let (_, _, cache) = setup();

        let err = cache.apply_update(update("9", "switch", "on")).await.unwrap_err();

        assert!(matches!(err, DeviceCacheError::NotFound(_)));
    }

    #[tokio::test]
    async fn should_reject_update_with_unparsable_device_id() {
        let (_, _, cache) = setup();
        let err = cache.apply_update(update("lamp", "switch", "on")).await.unwrap_err();
        assert!(matches!(err, DeviceCacheError::InvalidDevice(_)));
    }

    #[tokio::test]
    async fn should_skip_announcement_of_unchanged_value() {
        let (hub, _, cache) = setup();
        hub.put("1", switch("on"));
        cache.reload_all().await.unwrap();

        let unchanged = cache
            .set_attribute(DeviceId::new(1), "switch", Some("on".to_string()), false)
            .await
            .unwrap();
        let changed = cache
            .set_attribute(DeviceId::new(1), "switch", Some("off".to_string()), false)
            .await
            .unwrap();

        assert!(unchanged.is_none());
        assert_eq!(changed.unwrap().previous_value.as_deref(), Some("on"));
    }

    #[tokio::test]
    async fn should_forget_device_when_hub_no_longer_knows_it() {
        let (hub, _, cache) = setup();
        hub.put("1", switch("on"));
        cache.reload_all().await.unwrap();
        hub.devices.lock().clear();

        assert!(cache.reload_device(DeviceId::new(1)).await.unwrap().is_none());
        assert!(!cache.contains(DeviceId::new(1)));
    }

    #[tokio::test]
    async fn should_forward_command_for_cached_device() {
        let (hub, _, cache) = setup();
        hub.put("1", switch("on"));
        cache.reload_all().await.unwrap();

        cache.send_command(DeviceId::new(1), "setLevel", Some("40")).await.unwrap();
        let missing = cache.send_command(DeviceId::new(2), "on", None).await;

        assert!(matches!(missing, Err(DeviceCacheError::NotFound(_))));
        assert_eq!(
            *hub.commands.lock(),
            [(DeviceId::new(1), "setLevel".to_string(), Some("40".to_string()))]
        );
    }

    #[tokio::test]
    async fn should_apply_updates_from_stream() {
        let (hub, _, cache) = setup();
        hub.put("1", switch("off"));
        cache.reload_all().await.unwrap();
        let (tx, rx) = mpsc::channel(8);
        let listener = cache.spawn_update_listener(rx);

        tx.send(update("1", "switch", "on")).await.unwrap();
        drop(tx);
        listener.await.unwrap();

        assert_eq!(cache.device(DeviceId::new(1)).unwrap().attribute("switch"), Some("on"));
    }

    #[tokio::test(start_paused = true)]
    async fn should_reload_periodically() {
        let (hub, _, cache) = setup();
        let reloader = cache.spawn_periodic_reload(Duration::from_secs(15 * 60));
        hub.put("1", switch("on"));

        tokio::time::sleep(Duration::from_secs(14 * 60)).await;
        assert!(!cache.contains(DeviceId::new(1)));

        tokio::time::sleep(Duration::from_secs(2 * 60)).await;
        assert!(cache.contains(DeviceId::new(1)));
        reloader.abort();
    }
}
