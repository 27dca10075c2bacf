use level_core::level::{average_truncating, level_from};
use level_core::record::CycleRecord;
use proptest::prelude::*;

proptest! {
    #[test]
    fn average_is_floor_of_mean(raws in prop::collection::vec(0i32..=4095, 1..64)) {
        let n = raws.len() as u32;
        let sum: i64 = raws.iter().map(|&r| i64::from(r)).sum();
        let avg = average_truncating(sum, n);
        prop_assert_eq!(i64::from(avg), sum.div_euclid(i64::from(n)));
        let lo = *raws.iter().min().unwrap();
        let hi = *raws.iter().max().unwrap();
        prop_assert!(lo <= avg && avg <= hi);
    }

    #[test]
    fn level_is_never_negative(avg in any::<i32>(), baseline in any::<i32>()) {
        let level = level_from(avg, baseline);
        prop_assert!(level >= 0);
        if avg > baseline {
            prop_assert_eq!(i64::from(level), (i64::from(avg) - i64::from(baseline)).min(i64::from(i32::MAX)));
        } else {
            prop_assert_eq!(level, 0);
        }
    }

    #[test]
    fn record_line_has_three_integer_fields(ts in 0i64.., raw in 0i32..=65535, baseline in 0i32..=65535) {
        let rec = CycleRecord::new(ts, raw, baseline);
        let mut buf = Vec::new();
        rec.write_line(&mut buf).unwrap();
        let line = String::from_utf8(buf).unwrap();
        prop_assert!(line.ends_with('\n'));
        let fields: Vec<i64> = line.trim_end().split(',').map(|f| f.parse().unwrap()).collect();
        prop_assert_eq!(fields, vec![ts, i64::from(raw), i64::from(rec.level)]);
    }
}
