use crate::models::{LiveLocation, Prediction};
use chrono::{Local, NaiveTime};

/// Distance to the next major stop assumed by the ETA estimate.
const REMAINING_KM: f64 = 8.0;
const PEAK_DELAY_MIN: u32 = 5;

pub fn predict(bus_id: &str, live: &LiveLocation) -> Prediction {
    predict_at(Local::now().time(), bus_id, live)
}

pub fn predict_at(now: NaiveTime, bus_id: &str, live: &LiveLocation) -> Prediction {
    let peak = is_peak_hour(now);
    let crowd_level = crowd_level(live.occupancy);

    let predicted_eta_min = if live.speed <= 5.0 {
        if peak { 25 } else { 20 }
    } else {
        let eta = (REMAINING_KM * 60.0 / live.speed.max(10.0)) as u32;
        if peak { eta + PEAK_DELAY_MIN } else { eta }
    };

    Prediction {
        bus_id: bus_id.to_string(),
        predicted_eta_min,
        crowd_level: crowd_level.to_string(),
        is_peak_hour: peak,
        analysis: format!(
            "Bus {bus_id} is expected to reach next major stop in ~{predicted_eta_min} minutes with {crowd_level} crowd."
        ),
    }
}

/// Morning 08:00-11:00 and evening 17:00-20:00, both ends inclusive.
pub fn is_peak_hour(now: NaiveTime) -> bool {
    let within = |from: u32, to: u32| {
        let start = NaiveTime::from_hms_opt(from, 0, 0);
        let end = NaiveTime::from_hms_opt(to, 0, 0);
        matches!((start, end), (Some(start), Some(end)) if start <= now && now <= end)
    };
    within(8, 11) || within(17, 20)
}

fn crowd_level(occupancy: u32) -> &'static str {
    match occupancy {
        0..=19 => "Low",
        20..=39 => "Medium",
        _ => "High",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(speed: f64, occupancy: u32) -> LiveLocation {
        LiveLocation {
            lat: 21.7643,
            lng: 72.1511,
            speed,
            occupancy,
            last_update: "2025-11-20T09:00:00".into(),
        }
    }

    fn at(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    #[test]
    fn peak_windows_are_inclusive() {
        assert!(is_peak_hour(at(8, 0)));
        assert!(is_peak_hour(at(11, 0)));
        assert!(!is_peak_hour(at(11, 1)));
        assert!(is_peak_hour(at(20, 0)));
        assert!(!is_peak_hour(at(6, 30)));
    }

    #[test]
    fn moving_bus_eta_uses_speed_floor() {
        let prediction = predict_at(at(13, 0), "3", &location(30.0, 25));
        assert_eq!(prediction.predicted_eta_min, 16);
        assert_eq!(prediction.crowd_level, "Medium");
        assert!(!prediction.is_peak_hour);

        // Slow but moving buses are treated as 10 km/h.
        let crawling = predict_at(at(13, 0), "3", &location(8.0, 5));
        assert_eq!(crawling.predicted_eta_min, 48);
        assert_eq!(crawling.crowd_level, "Low");
    }

    #[test]
    fn stopped_bus_uses_fixed_eta_with_peak_delay() {
        let off_peak = predict_at(at(14, 0), "9", &location(0.0, 45));
        let peak = predict_at(at(18, 0), "9", &location(0.0, 45));
        assert_eq!(off_peak.predicted_eta_min, 20);
        assert_eq!(peak.predicted_eta_min, 25);
        assert_eq!(peak.crowd_level, "High");
        assert_eq!(
            peak.analysis,
            "Bus 9 is expected to reach next major stop in ~25 minutes with High crowd."
        );
    }

    #[test]
    fn peak_adds_delay_to_moving_eta() {
        let prediction = predict_at(at(9, 30), "1", &location(40.0, 10));
        assert_eq!(prediction.predicted_eta_min, 12 + 5);
        assert!(prediction.is_peak_hour);
    }
}
