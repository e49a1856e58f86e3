//! Timer scheduler.
//!
//! Every timer trigger of a registered automation gets its own task: after a
//! short bootstrap delay it fires once, then keeps firing on the trigger's
//! period. Handler errors are logged and never stop the ticking.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tripwire_domain::event::{EventKind, TimerEvent};
use tripwire_domain::trigger::TriggerDefinition;

use crate::automation::RegisteredAutomation;
use crate::error::RegistrationError;
use crate::ports::EventsService;

/// Timing knobs of the [`TimerScheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Delay before the first, immediate fire.
    pub bootstrap_delay: Duration,
    /// Shortest period a trigger may tick at.
    pub min_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            bootstrap_delay: Duration::from_millis(500),
            min_interval: Duration::from_millis(50),
        }
    }
}

/// Fires timer events to automations on fixed periods.
///
/// Dropping the scheduler cancels every periodic task.
#[derive(Debug, Default)]
pub struct TimerScheduler {
    config: SchedulerConfig,
    timers: Mutex<HashMap<Arc<str>, Vec<JoinHandle<()>>>>,
}

impl TimerScheduler {
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            timers: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn config(&self) -> SchedulerConfig {
        self.config
    }

    /// Number of automations with running timers.
    #[must_use]
    pub fn registered_count(&self) -> usize {
        self.timers.lock().len()
    }

    /// Cancel every timer and forget every automation.
    pub fn shutdown(&self) {
        let timers: Vec<_> = self.timers.lock().drain().collect();
        for (name, handles) in timers {
            tracing::debug!(automation = %name, timers = handles.len(), "cancelling timers");
            for handle in handles {
                handle.abort();
            }
        }
    }

    /// Period of every timer trigger, clamped to the configured minimum.
    fn periods(&self, automation: &RegisteredAutomation) -> Result<Vec<Duration>, RegistrationError> {
        automation
            .triggers_of(EventKind::Timer)
            .filter_map(TriggerDefinition::as_timer)
            .map(|definition| {
                definition
                    .period()
                    .map(|period| period.max(self.config.min_interval))
                    .map_err(|source| RegistrationError::InvalidTrigger {
                        name: automation.name().to_string(),
                        source,
                    })
            })
            .collect()
    }

    fn spawn_timer(
        &self,
        runtime: &Handle,
        automation: Arc<RegisteredAutomation>,
        period: Duration,
    ) -> JoinHandle<()> {
        let bootstrap_delay = self.config.bootstrap_delay;
        runtime.spawn(async move {
            tokio::time::sleep(bootstrap_delay).await;
            fire(&automation);

            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                fire(&automation);
            }
        })
    }
}

/// Run the handler on its own task so a slow or panicking handler cannot
/// hold the ticker back.
fn fire(automation: &Arc<RegisteredAutomation>) {
    let automation = Arc::clone(automation);
    tokio::spawn(async move {
        let event = TimerEvent::now();
        tracing::trace!(automation = %automation.name(), fired_at = %event.fired_at, "timer fired");
        if let Err(err) = automation.handle(event.into()).await {
            tracing::error!(
                automation = %automation.name(),
                fired_at = %event.fired_at,
                error = %format!("{err:#}"),
                "automation failed to handle timer event"
            );
        }
    });
}

impl EventsService for TimerScheduler {
    fn name(&self) -> &'static str {
        "timer"
    }

    #[tracing::instrument(skip_all, fields(automation = %automation.name()))]
    fn register_automation(&self, automation: Arc<RegisteredAutomation>) -> Result<(), RegistrationError> {
        let name = Arc::clone(automation.name());
        if self.timers.lock().contains_key(&name) {
            return Err(RegistrationError::AlreadyRegistered {
                name: name.to_string(),
            });
        }

        let periods = self.periods(&automation)?;
        if periods.is_empty() {
            tracing::debug!("automation has no timer trigger");
            return Ok(());
        }
        let runtime = Handle::try_current().map_err(|_| RegistrationError::NoRuntime {
            name: name.to_string(),
        })?;

        let mut timers = self.timers.lock();
        if timers.contains_key(&name) {
            return Err(RegistrationError::AlreadyRegistered {
                name: name.to_string(),
            });
        }
        let handles = periods
            .iter()
            .map(|period| {
                tracing::info!(period = ?period, "scheduling timer");
                self.spawn_timer(&runtime, Arc::clone(&automation), *period)
            })
            .collect();
        timers.insert(name, handles);
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    fn unregister_automation(&self, name: &str) -> bool {
        let Some(handles) = self.timers.lock().remove(name) else {
            return false;
        };
        for handle in &handles {
            handle.abort();
        }
        tracing::info!(timers = handles.len(), "timers cancelled");
        true
    }

    fn is_registered(&self, name: &str) -> bool {
        self.timers.lock().contains_key(name)
    }
}

impl Drop for TimerScheduler {
    fn drop(&mut self) {
        for handle in self.timers.get_mut().values().flatten() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::testing::{Behavior, SpyAutomation, registered};
    use tripwire_domain::trigger::{
        Buildable, DeviceTrigger, IntervalUnit, ShortInterval, TimerTrigger, TimerTriggerDefinition,
    };

    fn every(value: u32, unit: IntervalUnit) -> TriggerDefinition {
        TimerTrigger::every(value, unit).unwrap().build()
    }

    /// Let spawned handler tasks run.
    async fn settle() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn should_default_to_half_second_bootstrap_and_fifty_ms_floor() {
        let config = SchedulerConfig::default();
        assert_eq!(config.bootstrap_delay, Duration::from_millis(500));
        assert_eq!(config.min_interval, Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn should_fire_after_bootstrap_then_every_period() {
        let scheduler = TimerScheduler::default();
        let spy = SpyAutomation::new("report", vec![every(30, IntervalUnit::Minutes)]);
        scheduler.register_automation(registered(&spy)).unwrap();

        tokio::time::sleep(Duration::from_millis(400)).await;
        settle().await;
        assert_eq!(spy.calls(), 0);

        tokio::time::sleep(Duration::from_millis(200)).await;
        settle().await;
        assert_eq!(spy.calls(), 1);

        tokio::time::sleep(Duration::from_secs(29 * 60)).await;
        settle().await;
        assert_eq!(spy.calls(), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        settle().await;
        assert_eq!(spy.calls(), 2);

        tokio::time::sleep(Duration::from_secs(30 * 60)).await;
        settle().await;
        assert_eq!(spy.calls(), 3);
        assert!(spy.received.lock().iter().all(|e| e.as_timer().is_some()));
    }

    #[tokio::test(start_paused = true)]
    async fn should_clamp_period_to_minimum_interval() {
        let scheduler = TimerScheduler::default();
        let spy = SpyAutomation::new("fast", vec![every(1, IntervalUnit::Ms)]);
        scheduler.register_automation(registered(&spy)).unwrap();

        tokio::time::sleep(Duration::from_millis(500 + 5)).await;
        settle().await;
        assert_eq!(spy.calls(), 1);

        tokio::time::sleep(Duration::from_millis(50 * 4)).await;
        settle().await;
        assert_eq!(spy.calls(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn should_keep_ticking_when_handler_fails() {
        let scheduler = TimerScheduler::default();
        let failing = SpyAutomation::with_behavior("broken", vec![every(1, IntervalUnit::Seconds)], Behavior::Fail);
        let panicking = SpyAutomation::with_behavior("worse", vec![every(1, IntervalUnit::Seconds)], Behavior::Panic);
        scheduler.register_automation(registered(&failing)).unwrap();
        scheduler.register_automation(registered(&panicking)).unwrap();

        tokio::time::sleep(Duration::from_millis(500 + 3_000 + 10)).await;
        settle().await;

        assert_eq!(failing.calls(), 4);
        assert_eq!(panicking.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn should_stop_firing_after_unregister() {
        let scheduler = TimerScheduler::default();
        let spy = SpyAutomation::new("tick", vec![every(1, IntervalUnit::Seconds)]);
        scheduler.register_automation(registered(&spy)).unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
        settle().await;

        assert!(scheduler.unregister_automation("tick"));
        tokio::time::sleep(Duration::from_secs(10)).await;
        settle().await;

        assert_eq!(spy.calls(), 1);
        assert!(!scheduler.is_registered("tick"));
        assert!(!scheduler.unregister_automation("tick"));
    }

    #[tokio::test(start_paused = true)]
    async fn should_cancel_everything_on_shutdown() {
        let scheduler = TimerScheduler::default();
        let a = SpyAutomation::new("a", vec![every(1, IntervalUnit::Seconds)]);
        let b = SpyAutomation::new("b", vec![every(2, IntervalUnit::Seconds), every(3, IntervalUnit::Seconds)]);
        scheduler.register_automation(registered(&a)).unwrap();
        scheduler.register_automation(registered(&b)).unwrap();
        assert_eq!(scheduler.registered_count(), 2);

        scheduler.shutdown();
        tokio::time::sleep(Duration::from_secs(5)).await;
        settle().await;

        assert_eq!(scheduler.registered_count(), 0);
        assert_eq!(a.calls() + b.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn should_cancel_timers_when_dropped() {
        let spy = SpyAutomation::new("tick", vec![every(1, IntervalUnit::Seconds)]);
        {
            let scheduler = TimerScheduler::default();
            scheduler.register_automation(registered(&spy)).unwrap();
        }
        tokio::time::sleep(Duration::from_secs(3)).await;
        settle().await;
        assert_eq!(spy.calls(), 0);
    }

    #[tokio::test]
    async fn should_reject_duplicate_name() {
        let scheduler = TimerScheduler::default();
        let spy = SpyAutomation::new("tick", vec![every(1, IntervalUnit::Hours)]);
        scheduler.register_automation(registered(&spy)).unwrap();

        let err = scheduler.register_automation(registered(&spy)).unwrap_err();

        assert!(matches!(err, RegistrationError::AlreadyRegistered { .. }));
        scheduler.shutdown();
    }

    #[tokio::test]
    async fn should_reject_multi_unit_trigger_as_a_whole() {
        let scheduler = TimerScheduler::default();
        let multi = TimerTriggerDefinition {
            intervals: vec![
                ShortInterval {
                    unit: IntervalUnit::Hours,
                    value: 1.0,
                },
                ShortInterval {
                    unit: IntervalUnit::Minutes,
                    value: 30.0,
                },
            ],
        };
        let spy = SpyAutomation::new("mixed", vec![every(1, IntervalUnit::Seconds), multi.build()]);

        let err = scheduler.register_automation(registered(&spy)).unwrap_err();

        assert!(matches!(err, RegistrationError::InvalidTrigger { ref name, .. } if name == "mixed"));
        assert!(!scheduler.is_registered("mixed"));
    }

    #[tokio::test]
    async fn should_ignore_automation_without_timer_trigger() {
        let scheduler = TimerScheduler::default();
        let spy = SpyAutomation::new("lamp", vec![DeviceTrigger::for_device(1).build()]);

        scheduler.register_automation(registered(&spy)).unwrap();

        assert!(!scheduler.is_registered("lamp"));
    }

    #[test]
    fn should_require_runtime_to_schedule() {
        let scheduler = TimerScheduler::default();
        let spy = SpyAutomation::new("tick", vec![every(1, IntervalUnit::Seconds)]);

        let err = scheduler.register_automation(registered(&spy)).unwrap_err();

        assert_eq!(
            err,
            RegistrationError::NoRuntime {
                name: "tick".to_string()
            }
        );
    }
}
