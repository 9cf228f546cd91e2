//! Deterministic generation of customer names, vehicles and plates from
//! curated lists. Same RNG seed, same output.

use crate::rng::SampleRng;

/// Deterministic generator for the text fields of sample customers.
pub struct NameGenerator;

impl NameGenerator {
    /// Family name followed by given name, no separator (e.g. "김민준").
    pub fn generate_full_name(rng: &mut SampleRng) -> String {
        let family = Self::pick(rng, Self::family_names());
        let given = Self::pick(rng, Self::given_names());
        format!("{family}{given}")
    }

    /// Domestic vehicle model name.
    pub fn generate_vehicle_name(rng: &mut SampleRng) -> &'static str {
        Self::pick(rng, Self::vehicle_names())
    }

    /// Passenger plate in the `12가3456` layout.
    pub fn generate_plate(rng: &mut SampleRng) -> String {
        let region = rng.range_i64(10, 99);
        let syllable = Self::pick(rng, Self::plate_syllables());
        let serial = rng.range_i64(1000, 9999);
        format!("{region}{syllable}{serial}")
    }

    /// Mobile number in `010-XXXX-XXXX` form.
    pub fn generate_mobile(rng: &mut SampleRng) -> String {
        format!("010-{}-{}", rng.range_i64(1000, 9999), rng.range_i64(1000, 9999))
    }

    fn pick(rng: &mut SampleRng, items: &'static [&'static str]) -> &'static str {
        rng.pick(items).copied().unwrap_or_default()
    }

    fn family_names() -> &'static [&'static str] {
        &[
            "김", "이", "박", "최", "정", "강", "조", "윤", "장", "임",
            "한", "오", "서", "신", "권", "황", "안", "송", "류", "홍",
        ]
    }

    fn given_names() -> &'static [&'static str] {
        &[
            "민준", "서연", "도윤", "지우", "하준", "서윤", "시우", "하은",
            "주원", "지민", "예준", "수아", "건우", "지아", "현우", "채원",
            "철수", "영희", "민수", "지원", "대한", "미나", "현우", "소희",
            "도현", "성민", "은지", "동현", "수빈", "재현",
        ]
    }

    fn vehicle_names() -> &'static [&'static str] {
        &[
            "소나타", "K5", "그랜저", "아반떼", "투싼",
            "스포티지", "K3", "모닝", "카니발", "싼타페",
        ]
    }

    fn plate_syllables() -> &'static [&'static str] {
        &["가", "나", "다", "라", "마", "바", "사", "아", "자", "차"]
    }
}
