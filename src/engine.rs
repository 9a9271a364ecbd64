//! Readiness engine orchestration
//!
//! Owns the stores, the computation registry, and the provider handles,
//! and drives the daily pipeline: biometrics fold into baselines,
//! activities dedup and aggregate into strain and training load, sleep
//! scores on its own task, the body-stress detector sweeps the trailing
//! window, and recovery fuses last after awaiting the same-date sleep
//! result on a watch channel. Completed results are announced on a
//! broadcast bus.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tokio::sync::{broadcast, watch, Mutex, RwLock};

use crate::baseline::{aggregate_daily, baseline_metric_for, BaselineTracker};
use crate::config::EngineConfig;
use crate::dedup::Deduplicator;
use crate::error::Result;
use crate::illness::{DailyVitals, IllnessContext, IllnessDetector};
use crate::models::{
    Activity, ActivitySamples, AthleteProfile, BaselineMetric, BiometricMetric, BiometricSample,
    DailyBaseline, DailyLoad, DailyScore, DateWindow, FtpSource, IllnessIndicator, ScoreType,
    SleepSession,
};
use crate::pmc::{LoadSeed, LoadTracker, LoadTrends};
use crate::power::{FtpEstimate, PowerObservation, ThresholdEstimator};
use crate::providers::{ActivityPlatform, TierSource, WearableFeed};
use crate::recovery::{RecoveryInputs, RecoveryScoreCalculator};
use crate::registry::{await_published, Computation, ComputationRegistry, ComputationSlot};
use crate::sleep::{
    signed_minutes_from_midnight, SleepContext, SleepDebtLedger, SleepScoreCalculator,
};
use crate::store::{BaselineStore, LoadStore, ScoreStore};
use crate::strain::{ActivityImpulse, StrainCalculator, StrainContext};
use crate::zones::ZoneCalculator;

/// Events announced on the engine's broadcast bus
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A daily score was computed and stored
    ScorePublished(DailyScore),

    /// The training load series gained or replaced a day
    LoadUpdated(DailyLoad),

    /// The body-stress detector raised or refreshed an indicator
    IllnessRaised(IllnessIndicator),

    /// A previously active indicator did not recur
    IllnessCleared { date: NaiveDate },

    /// FTP or zones were regenerated
    ThresholdsUpdated { ftp: Option<u16>, source: FtpSource },
}

/// How the recovery stage obtains the same-date sleep score
enum SleepWait {
    Ready(Option<DailyScore>),
    Channel(watch::Receiver<Option<DailyScore>>),
}

/// Daily biometric values, aggregated per metric
type DailyMetrics = BTreeMap<NaiveDate, BTreeMap<BiometricMetric, f64>>;

/// Orchestrates the daily readiness pipeline
pub struct ReadinessEngine {
    config: EngineConfig,

    wearable: Arc<dyn WearableFeed>,
    platforms: Vec<Arc<dyn ActivityPlatform>>,
    tier_source: Arc<dyn TierSource>,

    scores: ScoreStore,
    loads: LoadStore,
    baselines: BaselineStore,
    registry: ComputationRegistry,

    tracker: Mutex<BaselineTracker>,
    debt: Mutex<SleepDebtLedger>,
    profile: RwLock<AthleteProfile>,
    illness: RwLock<Option<IllnessIndicator>>,

    sleep_calc: SleepScoreCalculator,
    strain_calc: StrainCalculator,
    recovery_calc: RecoveryScoreCalculator,
    load_tracker: LoadTracker,
    illness_detector: IllnessDetector,
    threshold_estimator: ThresholdEstimator,
    dedup: Deduplicator,

    events: broadcast::Sender<EngineEvent>,
}

impl ReadinessEngine {
    pub fn new(
        config: EngineConfig,
        wearable: Arc<dyn WearableFeed>,
        platforms: Vec<Arc<dyn ActivityPlatform>>,
        tier_source: Arc<dyn TierSource>,
    ) -> Arc<Self> {
        let sleep_calc = SleepScoreCalculator::with_config(config.sleep.clone());
        let strain_calc = StrainCalculator::with_config(config.strain.clone());
        let recovery_calc = RecoveryScoreCalculator::with_config(config.recovery.clone());
        let load_tracker = LoadTracker::with_config(config.load);
        let illness_detector = IllnessDetector::with_config(config.illness.clone());
        let threshold_estimator = ThresholdEstimator::with_config(config.threshold.clone());
        let dedup = Deduplicator::with_config(config.dedup.clone());
        let tracker = Mutex::new(BaselineTracker::with_config(config.baseline.clone()));
        let (events, _) = broadcast::channel(config.runtime.event_capacity.max(1));

        Arc::new(ReadinessEngine {
            config,
            wearable,
            platforms,
            tier_source,
            scores: ScoreStore::new(),
            loads: LoadStore::new(),
            baselines: BaselineStore::new(),
            registry: ComputationRegistry::new(),
            tracker,
            debt: Mutex::new(SleepDebtLedger::new()),
            profile: RwLock::new(AthleteProfile::default()),
            illness: RwLock::new(None),
            sleep_calc,
            strain_calc,
            recovery_calc,
            load_tracker,
            illness_detector,
            threshold_estimator,
            dedup,
            events,
        })
    }

    /// Run the daily pipeline for one date.
    ///
    /// Re-running the same date is idempotent: already-published scores
    /// are skipped via the registry, baseline updates replace that day's
    /// contribution, and the debt ledger records each night once.
    pub async fn refresh(self: &Arc<Self>, date: NaiveDate) -> Result<()> {
        tracing::info!(%date, "daily refresh started");

        // All provider fetches happen before any computation is claimed,
        // so an upstream failure leaves the registry untouched
        let window = DateWindow::trailing(date, i64::from(self.config.baseline.window_days));
        let samples = self.wearable.biometric_samples(&window).await?;
        let daily_metrics = aggregate_by_day(&samples);

        let mut sessions: BTreeMap<NaiveDate, SleepSession> = BTreeMap::new();
        for day in window.days() {
            if let Some(session) = self.wearable.sleep_session(day).await? {
                sessions.insert(day, session);
            }
        }

        let day_window = DateWindow::new(date, date);
        let mut fetched = Vec::new();
        for platform in &self.platforms {
            fetched.extend(platform.activities(&day_window).await?);
        }
        let canonical = self.dedup.dedup(fetched);
        let items = self.attach_samples(canonical).await;

        self.update_baselines(&daily_metrics, &sessions).await;

        let activity_minutes: f64 = items.iter().map(|(a, _)| a.duration_minutes()).sum();
        {
            let snapshot = self.tracker.lock().await.update(
                BaselineMetric::TrainingVolume,
                activity_minutes,
                date,
            );
            self.baselines.put(snapshot).await;
        }

        // Strain, and the load state it drives
        if let Computation::Started(slot) = self.registry.begin(date, ScoreType::Strain) {
            let tss = self.compute_strain(date, &items, &daily_metrics, slot).await;
            self.update_load(date, tss).await?;
        }

        // Sleep runs as its own task; recovery later awaits its channel
        let sleep_wait = match self.registry.begin(date, ScoreType::Sleep) {
            Computation::Started(slot) => {
                let receiver = slot.subscribe();
                let engine = Arc::clone(self);
                let session = sessions.get(&date).cloned();
                tokio::spawn(async move {
                    engine.run_sleep_task(date, session, slot).await;
                });
                SleepWait::Channel(receiver)
            }
            Computation::Done(score) => SleepWait::Ready(Some(score)),
            Computation::Joined(receiver) => SleepWait::Channel(receiver),
        };

        let sleep_score = match sleep_wait {
            SleepWait::Ready(score) => score,
            SleepWait::Channel(receiver) => {
                let bound = StdDuration::from_millis(self.config.runtime.sleep_wait_ms);
                let score = await_published(receiver, bound).await;
                if score.is_none() {
                    tracing::warn!(%date, "sleep result never arrived, recovery will degrade");
                }
                score
            }
        };

        let indicator = self
            .evaluate_illness(date, &daily_metrics)
            .await;

        self.compute_recovery(date, &daily_metrics, sleep_score, indicator)
            .await;

        tracing::info!(%date, "daily refresh finished");
        Ok(())
    }

    /// Replay the training load series across a historical window.
    ///
    /// Seeds from the last stored state before the window, or from the
    /// estimated two-week mean when no history exists. Runs as one
    /// chronological batch; days are never replayed in parallel.
    pub async fn backfill_loads(&self, window: &DateWindow) -> Result<Vec<DailyLoad>> {
        let mut fetched = Vec::new();
        for platform in &self.platforms {
            fetched.extend(platform.activities(window).await?);
        }
        let canonical = self.dedup.dedup(fetched);
        let items = self.attach_samples(canonical).await;

        let ctx = self.strain_context(window.start).await;
        let mut daily_tss: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
        for ((activity, _), impulse) in items
            .iter()
            .zip(self.strain_calc.batch_impulses(&items, &ctx))
        {
            match impulse {
                Ok(impulse) => {
                    *daily_tss.entry(activity.date()).or_insert(Decimal::ZERO) +=
                        impulse.impulse;
                }
                Err(err) => tracing::warn!(%err, "activity skipped during backfill"),
            }
        }

        let (seed, start) = match self.loads.latest_before(window.start).await {
            Some(last) => {
                let next = last.date.succ_opt().unwrap_or(window.start);
                (
                    LoadSeed::Known {
                        ctl: last.ctl,
                        atl: last.atl,
                    },
                    next,
                )
            }
            None => (LoadSeed::Estimated, window.start),
        };

        // Cover any gap between the stored series and the requested
        // window with the TSS already on record
        if start < window.start {
            for load in self.loads.range(&DateWindow::new(start, window.start)).await {
                daily_tss.entry(load.date).or_insert(load.tss);
            }
        }

        let replay_window = DateWindow::new(start, window.end);
        let series = self.load_tracker.replay(seed, &daily_tss, &replay_window)?;
        if let Some(last) = series.last() {
            self.emit(EngineEvent::LoadUpdated(last.clone()));
        }
        self.loads.put_many(series.clone()).await;

        tracing::info!(
            start = %replay_window.start,
            end = %replay_window.end,
            days = series.len(),
            "training load backfilled"
        );
        Ok(series)
    }

    /// Rebuild the power-duration curve over the tier-gated history and
    /// regenerate thresholds and zones.
    ///
    /// With no local estimate the profile keeps its externally supplied
    /// threshold; zones are left as they are.
    pub async fn refresh_thresholds(&self, as_of: NaiveDate) -> Result<Option<FtpEstimate>> {
        let tier = self.tier_source.account_tier().await?;
        let window = DateWindow::trailing(as_of, tier.history_window_days());

        let mut fetched = Vec::new();
        for platform in &self.platforms {
            fetched.extend(platform.activities(&window).await?);
        }
        let canonical = self.dedup.dedup(fetched);

        let mut observations = Vec::new();
        for activity in &canonical {
            if let Some(samples) = self.fetch_samples(activity).await {
                let watts = samples.power_series();
                if !watts.is_empty() {
                    observations.push(PowerObservation {
                        date: activity.date(),
                        activity_id: activity.id.clone(),
                        watts,
                    });
                }
            }
        }

        let estimate = match self.threshold_estimator.calculate_curve(&observations, &window) {
            Ok(curve) => self.threshold_estimator.estimate_ftp(&curve),
            Err(err) => {
                tracing::info!(%err, ?tier, "no local power curve");
                None
            }
        };

        if let Some(est) = &estimate {
            let mut profile = self.profile.write().await;
            let max_hr = profile.max_hr;
            ZoneCalculator::regenerate(&mut profile, Some(est.ftp), FtpSource::Computed, max_hr)?;
            self.emit(EngineEvent::ThresholdsUpdated {
                ftp: profile.ftp,
                source: profile.ftp_source,
            });
        }

        Ok(estimate)
    }

    /// Set externally supplied or manually entered thresholds; both zone
    /// sets regenerate in the same step
    pub async fn set_thresholds(
        &self,
        ftp: Option<u16>,
        source: FtpSource,
        max_hr: Option<u16>,
    ) -> Result<()> {
        let mut profile = self.profile.write().await;
        ZoneCalculator::regenerate(&mut profile, ftp, source, max_hr)?;
        self.emit(EngineEvent::ThresholdsUpdated {
            ftp: profile.ftp,
            source: profile.ftp_source,
        });
        Ok(())
    }

    /// Recompute one score for one date, ignoring the already-computed
    /// marker. Other scores for the day are left untouched.
    pub async fn force_recompute(
        self: &Arc<Self>,
        score_type: ScoreType,
        date: NaiveDate,
    ) -> Result<()> {
        self.registry.clear(date, score_type);
        self.refresh(date).await
    }

    pub async fn sleep_score(&self, date: NaiveDate) -> Option<DailyScore> {
        self.scores.get(ScoreType::Sleep, date).await
    }

    pub async fn recovery_score(&self, date: NaiveDate) -> Option<DailyScore> {
        self.scores.get(ScoreType::Recovery, date).await
    }

    pub async fn strain_score(&self, date: NaiveDate) -> Option<DailyScore> {
        self.scores.get(ScoreType::Strain, date).await
    }

    pub async fn training_load(&self, date: NaiveDate) -> Option<DailyLoad> {
        self.loads.get(date).await
    }

    /// Currently active body-stress indicator, if the latest pass raised
    /// one
    pub async fn illness_indicator(&self) -> Option<IllnessIndicator> {
        self.illness.read().await.clone()
    }

    pub async fn athlete_profile(&self) -> AthleteProfile {
        self.profile.read().await.clone()
    }

    /// Running sleep-debt balance in minutes
    pub async fn sleep_debt_minutes(&self) -> f64 {
        self.debt.lock().await.debt_minutes()
    }

    /// Ramp rate and freshness over the stored loads in the window
    pub async fn load_trends(&self, window: &DateWindow) -> Option<LoadTrends> {
        let series = self.loads.range(window).await;
        self.load_tracker.trends(&series)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: EngineEvent) {
        // Nothing may be listening; that is fine
        let _ = self.events.send(event);
    }

    /// Fold aggregated biometrics and sleep sessions into the rolling
    /// baselines, chronologically, storing a dated snapshot per day
    async fn update_baselines(
        &self,
        daily_metrics: &DailyMetrics,
        sessions: &BTreeMap<NaiveDate, SleepSession>,
    ) {
        let mut tracker = self.tracker.lock().await;

        for (day, metrics) in daily_metrics {
            for (metric, value) in metrics {
                if let Some(target) = baseline_metric_for(*metric) {
                    let snapshot = tracker.update(target, *value, *day);
                    self.baselines.put(snapshot).await;
                }
            }
        }

        for (day, session) in sessions {
            let snapshots = [
                tracker.update(
                    BaselineMetric::SleepDuration,
                    f64::from(session.total_sleep_minutes),
                    *day,
                ),
                tracker.update(
                    BaselineMetric::Bedtime,
                    signed_minutes_from_midnight(&session.bedtime),
                    *day,
                ),
                tracker.update(
                    BaselineMetric::WakeTime,
                    signed_minutes_from_midnight(&session.wake_time),
                    *day,
                ),
            ];
            for snapshot in snapshots {
                self.baselines.put(snapshot).await;
            }
        }
    }

    /// Compute and publish the day's strain; returns the day's total
    /// impulse for the load tracker
    async fn compute_strain(
        &self,
        date: NaiveDate,
        items: &[(Activity, Option<ActivitySamples>)],
        daily_metrics: &DailyMetrics,
        slot: ComputationSlot,
    ) -> Decimal {
        let ctx = self.strain_context(date).await;
        let impulses: Vec<ActivityImpulse> = self
            .strain_calc
            .batch_impulses(items, &ctx)
            .into_iter()
            .filter_map(|result| match result {
                Ok(impulse) => Some(impulse),
                Err(err) => {
                    tracing::warn!(%date, %err, "activity skipped");
                    None
                }
            })
            .collect();

        let today = daily_metrics.get(&date);
        let steps = today.and_then(|m| m.get(&BiometricMetric::StepCount).copied());
        let kcal = today.and_then(|m| m.get(&BiometricMetric::ActiveEnergy).copied());

        let daily = self.strain_calc.daily_strain(date, &impulses, steps, kcal);

        self.scores.put(daily.score.clone()).await;
        self.registry.publish(slot, &daily.score);
        self.emit(EngineEvent::ScorePublished(daily.score));

        daily.total_impulse
    }

    /// Advance the load series to `date`, replaying over any gap
    async fn update_load(&self, date: NaiveDate, tss: Decimal) -> Result<()> {
        let prev = match date.pred_opt() {
            Some(p) => self.loads.get(p).await,
            None => None,
        };

        let today = if let Some(prev) = prev {
            let load = self.load_tracker.advance(&prev, date, tss)?;
            self.loads.put(load.clone()).await;
            load
        } else if let Some(last) = self.loads.latest_before(date).await {
            let start = last.date.succ_opt().unwrap_or(date);
            let mut daily_tss: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
            for load in self.loads.range(&DateWindow::new(start, date)).await {
                daily_tss.insert(load.date, load.tss);
            }
            daily_tss.insert(date, tss);

            let seed = LoadSeed::Known {
                ctl: last.ctl,
                atl: last.atl,
            };
            let series =
                self.load_tracker
                    .replay(seed, &daily_tss, &DateWindow::new(start, date))?;
            let today = match series.last() {
                Some(last) => last.clone(),
                None => return Ok(()),
            };
            self.loads.put_many(series).await;
            today
        } else {
            let mut daily_tss = BTreeMap::new();
            daily_tss.insert(date, tss);
            let series = self.load_tracker.replay(
                LoadSeed::Estimated,
                &daily_tss,
                &DateWindow::new(date, date),
            )?;
            let today = match series.last() {
                Some(last) => last.clone(),
                None => return Ok(()),
            };
            self.loads.put_many(series).await;
            today
        };

        self.emit(EngineEvent::LoadUpdated(today));
        Ok(())
    }

    /// Score the night on its own task and publish through the slot
    async fn run_sleep_task(
        &self,
        date: NaiveDate,
        session: Option<SleepSession>,
        slot: ComputationSlot,
    ) {
        let Some(session) = session else {
            tracing::info!(%date, "no sleep session recorded");
            self.registry.abandon(slot);
            return;
        };

        let duration_baseline = self.baseline_before(BaselineMetric::SleepDuration, date).await;
        let bedtime_baseline = self.baseline_before(BaselineMetric::Bedtime, date).await;
        let wake_baseline = self.baseline_before(BaselineMetric::WakeTime, date).await;
        let prior_day_tss = match date.pred_opt() {
            Some(p) => self.loads.get(p).await.map(|l| l.tss),
            None => None,
        };

        let ctx = SleepContext {
            duration_baseline: duration_baseline.as_ref(),
            bedtime_baseline: bedtime_baseline.as_ref(),
            wake_baseline: wake_baseline.as_ref(),
            prior_day_tss,
        };

        match self.sleep_calc.score(&session, &ctx) {
            Ok(assessment) => {
                self.debt.lock().await.record_night(
                    date,
                    assessment.deficit_minutes,
                    self.config.sleep.surplus_repayment,
                );
                self.scores.put(assessment.score.clone()).await;
                self.registry.publish(slot, &assessment.score);
                self.emit(EngineEvent::ScorePublished(assessment.score));
            }
            Err(err) => {
                tracing::warn!(%date, %err, "sleep scoring skipped");
                self.registry.abandon(slot);
            }
        }
    }

    /// Sweep the trailing window for concurrent stress signals
    async fn evaluate_illness(
        &self,
        date: NaiveDate,
        daily_metrics: &DailyMetrics,
    ) -> Option<IllnessIndicator> {
        let window = DateWindow::trailing(date, self.config.illness.window_days);
        let volume_by_day: BTreeMap<NaiveDate, f64> = {
            let tracker = self.tracker.lock().await;
            tracker
                .window(BaselineMetric::TrainingVolume)
                .into_iter()
                .collect()
        };

        let mut vitals = Vec::with_capacity(window.num_days() as usize);
        for day in window.days() {
            let mut v = DailyVitals::new(day);
            if let Some(metrics) = daily_metrics.get(&day) {
                v.hrv = metrics.get(&BiometricMetric::Hrv).copied();
                v.resting_hr = metrics.get(&BiometricMetric::RestingHr).copied();
                v.respiratory_rate = metrics.get(&BiometricMetric::RespiratoryRate).copied();
            }
            v.sleep_score = self.scores.get(ScoreType::Sleep, day).await.map(|s| s.value);
            v.activity_minutes = volume_by_day.get(&day).copied();
            vitals.push(v);
        }

        let hrv_baseline = self.baseline_before(BaselineMetric::Hrv, date).await;
        let rhr_baseline = self.baseline_before(BaselineMetric::RestingHr, date).await;
        let respiratory_baseline = self
            .baseline_before(BaselineMetric::RespiratoryRate, date)
            .await;
        let activity_baseline = self
            .baseline_before(BaselineMetric::TrainingVolume, date)
            .await;

        let ctx = IllnessContext {
            hrv_baseline: hrv_baseline.as_ref(),
            rhr_baseline: rhr_baseline.as_ref(),
            respiratory_baseline: respiratory_baseline.as_ref(),
            activity_baseline: activity_baseline.as_ref(),
        };

        let indicator = self.illness_detector.evaluate(&vitals, &ctx);

        let mut current = self.illness.write().await;
        match (&*current, &indicator) {
            (Some(_), None) => self.emit(EngineEvent::IllnessCleared { date }),
            (_, Some(ind)) => self.emit(EngineEvent::IllnessRaised(ind.clone())),
            (None, None) => {}
        }
        *current = indicator.clone();

        indicator
    }

    /// Fuse the recovery score once its dependencies have settled
    async fn compute_recovery(
        &self,
        date: NaiveDate,
        daily_metrics: &DailyMetrics,
        sleep_score: Option<DailyScore>,
        indicator: Option<IllnessIndicator>,
    ) {
        let slot = match self.registry.begin(date, ScoreType::Recovery) {
            Computation::Started(slot) => slot,
            _ => return,
        };

        let today = daily_metrics.get(&date);
        let hrv_baseline = self.baseline_before(BaselineMetric::Hrv, date).await;
        let rhr_baseline = self.baseline_before(BaselineMetric::RestingHr, date).await;
        let respiratory_baseline = self
            .baseline_before(BaselineMetric::RespiratoryRate, date)
            .await;
        let tsb = self.loads.get(date).await.map(|l| l.tsb);

        let inputs = RecoveryInputs {
            date,
            hrv: today.and_then(|m| m.get(&BiometricMetric::Hrv).copied()),
            hrv_baseline: hrv_baseline.as_ref(),
            resting_hr: today.and_then(|m| m.get(&BiometricMetric::RestingHr).copied()),
            rhr_baseline: rhr_baseline.as_ref(),
            respiratory_rate: today
                .and_then(|m| m.get(&BiometricMetric::RespiratoryRate).copied()),
            respiratory_baseline: respiratory_baseline.as_ref(),
            sleep_score: sleep_score.as_ref(),
            tsb,
            illness: indicator.as_ref(),
        };

        match self.recovery_calc.score(&inputs) {
            Ok(score) => {
                self.scores.put(score.clone()).await;
                self.registry.publish(slot, &score);
                self.emit(EngineEvent::ScorePublished(score));
            }
            Err(err) => {
                tracing::warn!(%date, %err, "recovery scoring skipped");
                self.registry.abandon(slot);
            }
        }
    }

    /// Latest baseline snapshot strictly before the scoring date, so a
    /// day never compares against itself
    async fn baseline_before(
        &self,
        metric: BaselineMetric,
        date: NaiveDate,
    ) -> Option<DailyBaseline> {
        let prev = date.pred_opt()?;
        self.baselines.latest_on_or_before(metric, prev).await
    }

    async fn strain_context(&self, date: NaiveDate) -> StrainContext {
        let profile = self.profile.read().await;
        let resting_hr = self
            .baseline_before(BaselineMetric::RestingHr, date)
            .await
            .map(|b| b.mean.round().max(0.0) as u16);

        StrainContext {
            ftp: profile.ftp,
            max_hr: profile.max_hr,
            resting_hr,
        }
    }

    /// Pair each canonical activity with its stream, when the owning
    /// platform has one
    async fn attach_samples(
        &self,
        activities: Vec<Activity>,
    ) -> Vec<(Activity, Option<ActivitySamples>)> {
        let mut items = Vec::with_capacity(activities.len());
        for activity in activities {
            let samples = self.fetch_samples(&activity).await;
            items.push((activity, samples));
        }
        items
    }

    async fn fetch_samples(&self, activity: &Activity) -> Option<ActivitySamples> {
        for platform in &self.platforms {
            if !platform
                .name()
                .eq_ignore_ascii_case(&activity.source_platform)
            {
                continue;
            }
            match platform.activity_samples(&activity.id).await {
                Ok(samples) => return samples,
                Err(err) => {
                    // Stream loss degrades the method cascade, not the run
                    tracing::warn!(activity_id = %activity.id, %err, "sample fetch failed");
                    return None;
                }
            }
        }
        None
    }
}

impl std::fmt::Debug for ReadinessEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadinessEngine")
            .field("platforms", &self.platforms.len())
            .finish_non_exhaustive()
    }
}

/// Group raw samples per calendar day and collapse each metric with its
/// aggregation rule
fn aggregate_by_day(samples: &[BiometricSample]) -> DailyMetrics {
    let mut grouped: BTreeMap<NaiveDate, BTreeMap<BiometricMetric, Vec<f64>>> = BTreeMap::new();
    for sample in samples {
        grouped
            .entry(sample.date())
            .or_default()
            .entry(sample.metric)
            .or_default()
            .push(sample.value);
    }

    grouped
        .into_iter()
        .map(|(day, metrics)| {
            let aggregated = metrics
                .into_iter()
                .filter_map(|(metric, values)| {
                    aggregate_daily(metric, &values).map(|value| (metric, value))
                })
                .collect();
            (day, aggregated)
        })
        .collect()
}
