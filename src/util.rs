/// FNV-1a over the UTF-8 bytes. Stable across runs and platforms, unlike
/// `DefaultHasher`, so geometry seeded from it never changes between sessions.
pub fn stable_hash(value: &str) -> u32 {
    const OFFSET_BASIS: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;

    value.bytes().fold(OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(byte)).wrapping_mul(PRIME)
    })
}

pub fn edge_seed(source: &str, target: &str) -> u32 {
    let mut key = String::with_capacity(source.len() + target.len() + 1);
    key.push_str(source);
    key.push('>');
    key.push_str(target);
    stable_hash(&key)
}

#[derive(Clone, Debug)]
pub struct SeededRng {
    state: u32,
}

impl SeededRng {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    pub fn for_id(id: &str) -> Self {
        Self::new(stable_hash(id))
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(1_664_525)
            .wrapping_add(1_013_904_223);
        self.state
    }

    pub fn next_f32(&mut self) -> f32 {
        // top 24 bits fit an f32 mantissa exactly
        (self.next_u32() >> 8) as f32 / (1u32 << 24) as f32
    }

    pub fn range(&mut self, min: f32, max: f32) -> f32 {
        min + (max - min) * self.next_f32()
    }

    pub fn sign(&mut self) -> f32 {
        if self.next_f32() < 0.5 { -1.0 } else { 1.0 }
    }
}

pub fn short_label(name: &str, max_chars: usize) -> String {
    if name.chars().count() <= max_chars {
        return name.to_owned();
    }

    let mut label = name
        .chars()
        .take(max_chars.saturating_sub(1))
        .collect::<String>();
    label.push('…');
    label
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_hash_matches_fnv1a_reference() {
        assert_eq!(stable_hash(""), 0x811c_9dc5);
        assert_eq!(stable_hash("a"), 0xe40c_292c);
    }

    #[test]
    fn edge_seed_depends_on_direction() {
        assert_ne!(edge_seed("root", "a"), edge_seed("a", "root"));
        assert_ne!(edge_seed("ab", "c"), edge_seed("a", "bc"));
    }

    #[test]
    fn seeded_rng_replays_sequence() {
        let mut first = SeededRng::for_id("node-7");
        let mut second = SeededRng::for_id("node-7");
        for _ in 0..32 {
            assert_eq!(first.next_u32(), second.next_u32());
        }
    }

    #[test]
    fn seeded_rng_stays_in_unit_interval() {
        let mut rng = SeededRng::new(42);
        for _ in 0..1000 {
            let value = rng.next_f32();
            assert!((0.0..1.0).contains(&value));
        }
    }

    #[test]
    fn short_label_truncates_on_char_boundary() {
        assert_eq!(short_label("garden", 10), "garden");
        assert_eq!(short_label("élévation", 4), "élé…");
    }
}
