//! Training zone derivation
//!
//! Derives seven-band power and heart-rate zones from threshold values
//! and regenerates the athlete profile atomically so zones never
//! reference a stale threshold.

use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::ZoneError;
use crate::models::{AthleteProfile, FtpSource, HrZones, PowerZones};

/// Plausible FTP range in watts
pub const FTP_RANGE: (u16, u16) = (50, 800);

/// Plausible max heart rate range in bpm
pub const MAX_HR_RANGE: (u16, u16) = (120, 220);

/// Zone calculation utilities
pub struct ZoneCalculator;

impl ZoneCalculator {
    /// Power zones from FTP
    ///
    /// Seven ascending bands:
    /// - Z1: < 55% FTP (Active Recovery)
    /// - Z2: 55-75% FTP (Endurance)
    /// - Z3: 75-90% FTP (Tempo)
    /// - Z4: 90-105% FTP (Lactate Threshold)
    /// - Z5: 105-120% FTP (VO2 Max)
    /// - Z6: 120-150% FTP (Anaerobic Capacity)
    /// - Z7: > 150% FTP (Neuromuscular), open topped
    pub fn power_zones(ftp: u16) -> Result<PowerZones, ZoneError> {
        Self::validate_ftp(ftp)?;

        let ftp_decimal = Decimal::from(ftp);

        Ok(PowerZones {
            zone1_max: Self::band(ftp_decimal, dec!(0.55)),
            zone2_max: Self::band(ftp_decimal, dec!(0.75)),
            zone3_max: Self::band(ftp_decimal, dec!(0.90)),
            zone4_max: Self::band(ftp_decimal, dec!(1.05)),
            zone5_max: Self::band(ftp_decimal, dec!(1.20)),
            zone6_max: Self::band(ftp_decimal, dec!(1.50)),
            zone7_max: ftp * 3, // Sprint cap
        })
    }

    /// Heart rate zones from max HR
    ///
    /// Seven ascending bands at 55/65/75/82/89/94% of max, with the top
    /// band running to max itself.
    pub fn hr_zones(max_hr: u16) -> Result<HrZones, ZoneError> {
        Self::validate_max_hr(max_hr)?;

        let max_decimal = Decimal::from(max_hr);

        Ok(HrZones {
            zone1_max: Self::band(max_decimal, dec!(0.55)),
            zone2_max: Self::band(max_decimal, dec!(0.65)),
            zone3_max: Self::band(max_decimal, dec!(0.75)),
            zone4_max: Self::band(max_decimal, dec!(0.82)),
            zone5_max: Self::band(max_decimal, dec!(0.89)),
            zone6_max: Self::band(max_decimal, dec!(0.94)),
            zone7_max: max_hr,
        })
    }

    /// Regenerate the profile's thresholds and both zone sets in one
    /// step.
    ///
    /// Validation happens before any field is touched, so a rejected
    /// threshold leaves the profile exactly as it was. A missing
    /// threshold clears its zone set rather than leaving a stale one
    /// behind.
    pub fn regenerate(
        profile: &mut AthleteProfile,
        ftp: Option<u16>,
        ftp_source: FtpSource,
        max_hr: Option<u16>,
    ) -> Result<(), ZoneError> {
        let power_zones = ftp.map(Self::power_zones).transpose()?;
        let hr_zones = max_hr.map(Self::hr_zones).transpose()?;

        profile.ftp = ftp;
        profile.ftp_source = ftp_source;
        profile.power_zones = power_zones;
        profile.max_hr = max_hr;
        profile.hr_zones = hr_zones;
        profile.updated_at = Utc::now();

        tracing::info!(
            ftp = ?profile.ftp,
            source = ?profile.ftp_source,
            max_hr = ?profile.max_hr,
            "athlete thresholds regenerated"
        );

        Ok(())
    }

    /// Which power zone a reading falls into, 1 through 7
    pub fn power_zone_for(power: u16, zones: &PowerZones) -> u8 {
        if power <= zones.zone1_max {
            1
        } else if power <= zones.zone2_max {
            2
        } else if power <= zones.zone3_max {
            3
        } else if power <= zones.zone4_max {
            4
        } else if power <= zones.zone5_max {
            5
        } else if power <= zones.zone6_max {
            6
        } else {
            7
        }
    }

    /// Which heart rate zone a reading falls into, 1 through 7
    pub fn hr_zone_for(hr: u16, zones: &HrZones) -> u8 {
        if hr <= zones.zone1_max {
            1
        } else if hr <= zones.zone2_max {
            2
        } else if hr <= zones.zone3_max {
            3
        } else if hr <= zones.zone4_max {
            4
        } else if hr <= zones.zone5_max {
            5
        } else if hr <= zones.zone6_max {
            6
        } else {
            7
        }
    }

    fn band(value: Decimal, fraction: Decimal) -> u16 {
        // Inputs are pre-validated so the product always fits
        (value * fraction).round().to_u16().unwrap_or(u16::MAX)
    }

    fn validate_ftp(ftp: u16) -> Result<(), ZoneError> {
        let (min, max) = FTP_RANGE;
        if ftp < min || ftp > max {
            return Err(ZoneError::InvalidFtp { ftp, min, max });
        }
        Ok(())
    }

    fn validate_max_hr(max_hr: u16) -> Result<(), ZoneError> {
        let (min, max) = MAX_HR_RANGE;
        if max_hr < min || max_hr > max {
            return Err(ZoneError::InvalidMaxHr { max_hr, min, max });
        }
        Ok(())
    }
}
