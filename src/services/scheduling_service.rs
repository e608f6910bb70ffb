//! Reglas de disponibilidad de citas
//!
//! Cálculo de slots libres por fecha y ocupación mensual para el
//! calendario. Las funciones son puras: reciben lo que ya está reservado
//! en la base de datos y devuelven la vista calculada.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

use crate::models::appointment::TimeSlot;
use crate::utils::errors::AppError;

/// Slots libres de una fecha, en orden horario
pub fn available_slots(booked: &[TimeSlot]) -> Vec<TimeSlot> {
    let booked: BTreeSet<TimeSlot> = booked.iter().copied().collect();
    TimeSlot::ALL
        .iter()
        .copied()
        .filter(|slot| !booked.contains(slot))
        .collect()
}

/// Ocupación de un día del calendario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DayOccupancy {
    Available,
    PartiallyBooked,
    FullyBooked,
}

impl DayOccupancy {
    pub fn classify(booked_count: i64) -> Self {
        if booked_count >= TimeSlot::PER_DAY as i64 {
            DayOccupancy::FullyBooked
        } else if booked_count > 0 {
            DayOccupancy::PartiallyBooked
        } else {
            DayOccupancy::Available
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub booked_count: i64,
    pub available_count: i64,
    pub occupancy: DayOccupancy,
}

/// Vista mensual del calendario de citas
#[derive(Debug, Clone, Serialize)]
pub struct MonthCalendar {
    pub year: i32,
    pub month: u32,
    pub slots_per_day: usize,
    pub days: Vec<CalendarDay>,
    pub fully_booked_dates: Vec<NaiveDate>,
    pub partially_booked_dates: Vec<NaiveDate>,
}

/// Primer día del mes y primer día del mes siguiente
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), AppError> {
    if !(1..=12).contains(&month) {
        return Err(AppError::BadRequest(format!("Mes inválido: {}", month)));
    }
    if !(1970..=9999).contains(&year) {
        return Err(AppError::BadRequest(format!("Año inválido: {}", year)));
    }

    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AppError::BadRequest(format!("Fecha inválida: {}-{}", year, month)))?;
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let next = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .ok_or_else(|| AppError::BadRequest(format!("Fecha inválida: {}-{}", next_year, next_month)))?;

    Ok((first, next))
}

/// Construir el calendario a partir del conteo de citas no canceladas por día
pub fn build_month_calendar(
    year: i32,
    month: u32,
    counts: &HashMap<NaiveDate, i64>,
) -> Result<MonthCalendar, AppError> {
    let (first, next) = month_bounds(year, month)?;

    let days: Vec<CalendarDay> = first
        .iter_days()
        .take_while(|d| *d < next)
        .map(|date| {
            let booked_count = counts.get(&date).copied().unwrap_or(0);
            CalendarDay {
                date,
                booked_count,
                available_count: (TimeSlot::PER_DAY as i64 - booked_count).max(0),
                occupancy: DayOccupancy::classify(booked_count),
            }
        })
        .collect();

    let dates_with = |occupancy: DayOccupancy| -> Vec<NaiveDate> {
        days.iter()
            .filter(|d| d.occupancy == occupancy)
            .map(|d| d.date)
            .collect()
    };
    let fully_booked_dates = dates_with(DayOccupancy::FullyBooked);
    let partially_booked_dates = dates_with(DayOccupancy::PartiallyBooked);

    Ok(MonthCalendar {
        year: first.year(),
        month: first.month(),
        slots_per_day: TimeSlot::PER_DAY,
        days,
        fully_booked_dates,
        partially_booked_dates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_available_slots_is_set_difference_in_order() {
        let free = available_slots(&[TimeSlot::H20, TimeSlot::H09, TimeSlot::H13]);
        assert_eq!(free.len(), 9);
        assert_eq!(free.first(), Some(&TimeSlot::H10));
        assert_eq!(free.last(), Some(&TimeSlot::H19));
        assert!(!free.contains(&TimeSlot::H13));
    }

    #[test]
    fn test_available_slots_empty_and_full_days() {
        assert_eq!(available_slots(&[]), TimeSlot::ALL.to_vec());
        assert!(available_slots(&TimeSlot::ALL).is_empty());
    }

    #[test]
    fn test_day_classification_thresholds() {
        assert_eq!(DayOccupancy::classify(0), DayOccupancy::Available);
        assert_eq!(DayOccupancy::classify(1), DayOccupancy::PartiallyBooked);
        assert_eq!(DayOccupancy::classify(11), DayOccupancy::PartiallyBooked);
        assert_eq!(DayOccupancy::classify(12), DayOccupancy::FullyBooked);
        assert_eq!(DayOccupancy::classify(13), DayOccupancy::FullyBooked);
    }

    #[test]
    fn test_build_month_calendar() {
        let mut counts = HashMap::new();
        counts.insert(date(2024, 2, 10), 12);
        counts.insert(date(2024, 2, 14), 3);

        let calendar = build_month_calendar(2024, 2, &counts).unwrap();
        // 2024 es bisiesto
        assert_eq!(calendar.days.len(), 29);
        assert_eq!(calendar.fully_booked_dates, vec![date(2024, 2, 10)]);
        assert_eq!(calendar.partially_booked_dates, vec![date(2024, 2, 14)]);

        let valentine = &calendar.days[13];
        assert_eq!(valentine.date, date(2024, 2, 14));
        assert_eq!(valentine.available_count, 9);
    }

    #[test]
    fn test_build_month_calendar_december_rolls_year() {
        let calendar = build_month_calendar(2025, 12, &HashMap::new()).unwrap();
        assert_eq!(calendar.days.len(), 31);
        assert!(calendar.fully_booked_dates.is_empty());
        assert!(calendar.days.iter().all(|d| d.occupancy == DayOccupancy::Available));
    }

    #[test]
    fn test_invalid_month_is_rejected() {
        assert!(matches!(build_month_calendar(2025, 13, &HashMap::new()), Err(AppError::BadRequest(_))));
        assert!(matches!(month_bounds(2025, 0), Err(AppError::BadRequest(_))));
    }
}
