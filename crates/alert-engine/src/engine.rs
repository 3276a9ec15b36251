//! Alert Engine
//!
//! Owns the active-alert registry (keyed by aircraft and rule) and the
//! bounded history. One `analyze` call per flight batch drives the whole
//! lifecycle: create, in-place update, and auto-clear.

use std::collections::{HashMap, HashSet};

use alert_history::HistoryBuffer;
use chrono::{DateTime, Utc};
use flight_data::Flight;
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use crate::alert::{Alert, AlertCounts, AlertKey, AlertStatus, Severity};
use crate::rules::{evaluate, EngineConfig, Firing};

/// Broadcast capacity for alert change events.
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Changes produced by one analysis pass.
#[derive(Debug, Clone)]
pub struct AlertsChanged {
    /// Every currently active alert, most severe first.
    pub active: Vec<Alert>,
    /// Alerts created this pass.
    pub created: Vec<Alert>,
    /// Alerts resolved this pass.
    pub resolved: Vec<Alert>,
}

/// Rule engine with exclusive ownership of alert state.
///
/// All mutation goes through [`analyze`](Self::analyze) (or
/// [`clear_all`](Self::clear_all)); everything else is a read. Callers that
/// share the engine across tasks wrap it in a lock, keeping the single-writer
/// discipline.
pub struct AlertEngine {
    config: EngineConfig,
    active: HashMap<AlertKey, Alert>,
    history: HistoryBuffer<Alert>,
    events: broadcast::Sender<AlertsChanged>,
}

impl AlertEngine {
    pub fn new(config: EngineConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let history = HistoryBuffer::new(config.history_capacity);
        Self {
            config,
            active: HashMap::new(),
            history,
            events,
        }
    }

    /// Subscribe to change notifications. One event per `analyze` call that
    /// created or resolved at least one alert.
    pub fn subscribe(&self) -> broadcast::Receiver<AlertsChanged> {
        self.events.subscribe()
    }

    /// Analyze one flight batch at the current wall clock.
    pub fn analyze(&mut self, flights: &[Flight]) -> Option<AlertsChanged> {
        self.analyze_at(flights, Utc::now())
    }

    /// Analyze one flight batch, evaluating staleness against `now`.
    ///
    /// Returns the changes when at least one alert was created or resolved,
    /// `None` on a quiet pass. Active alerts whose condition held are
    /// refreshed in place and do not count as changes.
    pub fn analyze_at(&mut self, flights: &[Flight], now: DateTime<Utc>) -> Option<AlertsChanged> {
        let now_secs = now.timestamp();
        let mut fired_keys: HashSet<AlertKey> = HashSet::new();
        let mut created = Vec::new();

        for flight in flights {
            for firing in evaluate(flight, now_secs, &self.config.thresholds) {
                let key = AlertKey {
                    icao24: flight.icao24.clone(),
                    rule: firing.rule,
                };
                if let Some(alert) = self.raise(&key, flight, firing, now) {
                    created.push(alert);
                }
                fired_keys.insert(key);
            }
        }

        // Any active key that did not fire this cycle has recovered.
        let recovered: Vec<AlertKey> = self
            .active
            .keys()
            .filter(|key| !fired_keys.contains(*key))
            .cloned()
            .collect();

        let mut resolved = Vec::new();
        for key in recovered {
            if let Some(mut alert) = self.active.remove(&key) {
                alert.status = AlertStatus::Resolved;
                alert.cleared_at = Some(now);
                self.stamp_history(&alert);
                info!(icao24 = %alert.icao24, rule = ?alert.rule, "alert resolved");
                resolved.push(alert);
            }
        }

        if created.is_empty() && resolved.is_empty() {
            return None;
        }

        let changed = AlertsChanged {
            active: self.active_sorted(),
            created,
            resolved,
        };
        let _ = self.events.send(changed.clone());
        Some(changed)
    }

    /// Raise or refresh one alert. Returns the alert only when newly created.
    fn raise(
        &mut self,
        key: &AlertKey,
        flight: &Flight,
        firing: Firing,
        now: DateTime<Utc>,
    ) -> Option<Alert> {
        if let Some(existing) = self.active.get_mut(key) {
            existing.latitude = flight.latitude;
            existing.longitude = flight.longitude;
            existing.altitude_ft = flight.altitude_ft;
            existing.message = firing.message;
            existing.updated_at = now;
            return None;
        }

        let alert = Alert {
            id: Uuid::new_v4(),
            icao24: flight.icao24.clone(),
            rule: firing.rule,
            severity: firing.severity,
            title: firing.title,
            message: firing.message,
            callsign: flight.callsign.clone(),
            origin_country: flight.origin_country.clone(),
            latitude: flight.latitude,
            longitude: flight.longitude,
            altitude_ft: flight.altitude_ft,
            ground_speed_kt: flight.ground_speed_kt,
            squawk: flight.squawk.clone(),
            status: AlertStatus::Active,
            created_at: now,
            updated_at: now,
            cleared_at: None,
        };

        warn!(
            icao24 = %alert.icao24,
            rule = ?alert.rule,
            severity = ?alert.severity,
            "alert raised"
        );
        self.history.record(alert.clone());
        self.active.insert(key.clone(), alert.clone());
        Some(alert)
    }

    /// Stamp the history entry of a resolved instance in place. Resolution
    /// never writes a new entry.
    fn stamp_history(&mut self, alert: &Alert) {
        if let Some(entry) = self.history.entry_mut(|e| e.id == alert.id) {
            entry.status = AlertStatus::Resolved;
            entry.cleared_at = alert.cleared_at;
        }
    }

    /// Active alerts, most severe first. Within a tier, ordering is by
    /// creation time, then aircraft.
    pub fn active(&self) -> Vec<Alert> {
        self.active_sorted()
    }

    fn active_sorted(&self) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = self.active.values().cloned().collect();
        alerts.sort_by(|a, b| {
            a.severity
                .cmp(&b.severity)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.icao24.cmp(&b.icao24))
        });
        alerts
    }

    /// Active alert totals by severity tier.
    pub fn counts(&self) -> AlertCounts {
        let mut counts = AlertCounts {
            total: self.active.len(),
            ..Default::default()
        };
        for alert in self.active.values() {
            match alert.severity {
                Severity::Critical => counts.critical += 1,
                Severity::Warning => counts.warning += 1,
                Severity::Info => {}
            }
        }
        counts
    }

    /// Resolve every active alert immediately, bypassing the rule table.
    pub fn clear_all(&mut self) {
        let now = Utc::now();
        let drained: Vec<Alert> = self.active.drain().map(|(_, alert)| alert).collect();
        for mut alert in drained {
            alert.status = AlertStatus::Resolved;
            alert.cleared_at = Some(now);
            self.stamp_history(&alert);
        }
        info!("all active alerts cleared");
    }

    /// Alert history, newest first.
    pub fn history(&self) -> Vec<Alert> {
        self.history.iter().cloned().collect()
    }
}

impl Default for AlertEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use tokio::sync::broadcast::error::TryRecvError;

    use super::*;
    use crate::alert::AlertRule;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap()
    }

    fn airborne(icao24: &str) -> Flight {
        Flight {
            icao24: icao24.to_string(),
            callsign: None,
            origin_country: "India".to_string(),
            time_position: None,
            last_contact: Some(now().timestamp()),
            latitude: 20.0,
            longitude: 80.0,
            altitude_ft: Some(35_000),
            on_ground: false,
            ground_speed_kt: Some(450),
            heading_deg: 90,
            vertical_rate_ftmin: 0,
            geo_altitude_ft: None,
            squawk: None,
            spi: false,
            category: None,
        }
    }

    fn squawking(icao24: &str, code: &str) -> Flight {
        let mut flight = airborne(icao24);
        flight.squawk = Some(code.to_string());
        flight
    }

    #[test]
    fn test_emergency_squawk_creates_critical_alert() {
        let mut engine = AlertEngine::default();

        let changed = engine
            .analyze_at(&[squawking("abc123", "7700")], now())
            .unwrap();

        assert_eq!(changed.created.len(), 1);
        let alert = &changed.created[0];
        assert_eq!(alert.rule, AlertRule::EmergencySquawk);
        assert_eq!(alert.severity, Severity::Critical);
        assert!(alert.message.contains("General Emergency"));
        assert!(alert.message.contains("FL350"));
        assert_eq!(alert.status, AlertStatus::Active);
        assert_eq!(engine.counts().critical, 1);
    }

    #[test]
    fn test_grounded_flight_never_alerts() {
        let mut engine = AlertEngine::default();
        let mut flight = squawking("abc123", "7700");
        flight.on_ground = true;
        flight.vertical_rate_ftmin = -5_000;
        flight.altitude_ft = Some(100);

        assert!(engine.analyze_at(&[flight], now()).is_none());
        assert_eq!(engine.counts().total, 0);
        assert!(engine.history().is_empty());
    }

    #[test]
    fn test_one_active_alert_per_key() {
        let mut engine = AlertEngine::default();
        let flight = squawking("abc123", "7700");

        engine.analyze_at(&[flight.clone()], now());
        engine.analyze_at(&[flight.clone()], now() + Duration::seconds(15));
        engine.analyze_at(&[flight], now() + Duration::seconds(30));

        assert_eq!(engine.counts().total, 1);
        assert_eq!(engine.history().len(), 1);
    }

    #[test]
    fn test_ground_proximity_excludes_low_altitude() {
        let mut engine = AlertEngine::default();
        let mut flight = airborne("def456");
        flight.altitude_ft = Some(1_000);
        flight.vertical_rate_ftmin = -900;

        let changed = engine.analyze_at(&[flight], now()).unwrap();

        assert_eq!(changed.created.len(), 1);
        assert_eq!(changed.created[0].rule, AlertRule::GroundProximity);
        assert!(engine
            .active()
            .iter()
            .all(|a| a.rule != AlertRule::LowAltitude));
    }

    #[test]
    fn test_persisting_condition_updates_in_place() {
        let mut engine = AlertEngine::default();
        let mut flight = airborne("xyz900");
        flight.vertical_rate_ftmin = -2_000;
        flight.altitude_ft = Some(20_000);

        let t0 = now();
        let changed = engine.analyze_at(&[flight.clone()], t0).unwrap();
        assert_eq!(changed.created.len(), 1);
        let created_at = changed.created[0].created_at;
        let id = changed.created[0].id;

        // Two more cycles with the condition holding: no change events, the
        // alert is refreshed in place.
        flight.altitude_ft = Some(18_000);
        assert!(engine
            .analyze_at(&[flight.clone()], t0 + Duration::seconds(15))
            .is_none());
        flight.altitude_ft = Some(16_000);
        assert!(engine
            .analyze_at(&[flight.clone()], t0 + Duration::seconds(30))
            .is_none());

        let active = engine.active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, id);
        assert_eq!(active[0].created_at, created_at);
        assert_eq!(active[0].updated_at, t0 + Duration::seconds(30));
        assert_eq!(active[0].altitude_ft, Some(16_000));

        // Condition reverts: exactly one resolve event.
        flight.vertical_rate_ftmin = 0;
        let changed = engine
            .analyze_at(&[flight], t0 + Duration::seconds(45))
            .unwrap();
        assert!(changed.created.is_empty());
        assert_eq!(changed.resolved.len(), 1);
        assert_eq!(changed.resolved[0].id, id);
        assert_eq!(changed.resolved[0].status, AlertStatus::Resolved);
        assert_eq!(
            changed.resolved[0].cleared_at,
            Some(t0 + Duration::seconds(45))
        );
        assert!(engine.active().is_empty());
    }

    #[test]
    fn test_retrigger_creates_new_instance() {
        let mut engine = AlertEngine::default();
        let mut flight = airborne("xyz900");
        flight.vertical_rate_ftmin = -2_000;

        let t0 = now();
        let first = engine.analyze_at(&[flight.clone()], t0).unwrap().created[0].clone();

        let mut calm = flight.clone();
        calm.vertical_rate_ftmin = 0;
        engine.analyze_at(&[calm], t0 + Duration::seconds(15));

        let second = engine
            .analyze_at(&[flight], t0 + Duration::seconds(30))
            .unwrap()
            .created[0]
            .clone();

        assert_ne!(first.id, second.id);
        assert_eq!(second.created_at, t0 + Duration::seconds(30));
        assert_eq!(engine.history().len(), 2);
    }

    #[test]
    fn test_signal_lost_resolves_into_history() {
        let mut engine = AlertEngine::default();
        let t0 = now();

        let mut flight = airborne("ghi789");
        flight.last_contact = Some(t0.timestamp() - 75);
        let changed = engine.analyze_at(&[flight.clone()], t0).unwrap();
        assert_eq!(changed.created[0].rule, AlertRule::SignalLost);
        assert_eq!(changed.created[0].severity, Severity::Warning);

        let t1 = t0 + Duration::seconds(15);
        flight.last_contact = Some(t1.timestamp() - 10);
        let changed = engine.analyze_at(&[flight], t1).unwrap();
        assert_eq!(changed.resolved.len(), 1);

        let history = engine.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, AlertStatus::Resolved);
        assert_eq!(history[0].cleared_at, Some(t1));
    }

    #[test]
    fn test_empty_batch_resolves_everything() {
        let mut engine = AlertEngine::default();
        engine.analyze_at(&[squawking("abc123", "7700")], now());

        let changed = engine
            .analyze_at(&[], now() + Duration::seconds(15))
            .unwrap();
        assert_eq!(changed.resolved.len(), 1);
        assert!(changed.active.is_empty());
        assert_eq!(engine.counts().total, 0);
    }

    #[test]
    fn test_multiple_rules_one_flight() {
        let mut engine = AlertEngine::default();
        let mut flight = squawking("abc123", "7600");
        flight.vertical_rate_ftmin = -2_000;
        flight.ground_speed_kt = Some(700);

        let changed = engine.analyze_at(&[flight], now()).unwrap();
        assert_eq!(changed.created.len(), 3);

        let counts = engine.counts();
        assert_eq!(counts.total, 3);
        assert_eq!(counts.critical, 2);
        assert_eq!(counts.warning, 1);
    }

    #[test]
    fn test_active_orders_by_severity_then_age() {
        let mut engine = AlertEngine::default();
        let t0 = now();

        let mut slow_low = airborne("warn01");
        slow_low.altitude_ft = Some(2_000);
        engine.analyze_at(&[slow_low.clone()], t0);

        let mut both = vec![slow_low, squawking("crit01", "7700")];
        engine.analyze_at(&both, t0 + Duration::seconds(15));

        let active = engine.active();
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].icao24, "crit01");
        assert_eq!(active[0].severity, Severity::Critical);
        assert_eq!(active[1].icao24, "warn01");

        // Ties inside a tier resolve by creation time.
        both.push({
            let mut f = airborne("warn02");
            f.altitude_ft = Some(2_500);
            f
        });
        engine.analyze_at(&both, t0 + Duration::seconds(30));
        let active = engine.active();
        assert_eq!(active[1].icao24, "warn01");
        assert_eq!(active[2].icao24, "warn02");
    }

    #[test]
    fn test_clear_all_resolves_without_notifying() {
        let mut engine = AlertEngine::default();
        let mut events = engine.subscribe();
        engine.analyze_at(&[squawking("abc123", "7700")], now());
        assert!(events.try_recv().is_ok());

        engine.clear_all();

        assert!(engine.active().is_empty());
        assert_eq!(engine.counts().total, 0);
        assert_eq!(engine.history()[0].status, AlertStatus::Resolved);
        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_history_capacity_keeps_newest() {
        let config = EngineConfig {
            history_capacity: 20,
            ..Default::default()
        };
        let mut engine = AlertEngine::new(config);

        let flights: Vec<Flight> = (0..70)
            .map(|i| squawking(&format!("ac{i:04}"), "7700"))
            .collect();
        engine.analyze_at(&flights, now());

        let history = engine.history();
        assert_eq!(history.len(), 20);
        assert_eq!(history[0].icao24, "ac0069");
        assert_eq!(history[19].icao24, "ac0050");
    }

    #[test]
    fn test_quiet_pass_emits_no_event() {
        let mut engine = AlertEngine::default();
        let mut events = engine.subscribe();

        assert!(engine.analyze_at(&[airborne("aaa111")], now()).is_none());
        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    }
}
