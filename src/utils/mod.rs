//! Utility functions for dl-learner

use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Save object to JSON file
pub fn save_json<T: Serialize>(obj: &T, path: impl AsRef<Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(obj)?;
    let mut file = File::create(path)?;
    file.write_all(json.as_bytes())?;
    Ok(())
}

/// Load object from JSON file
pub fn load_json<T: for<'de> Deserialize<'de>>(path: impl AsRef<Path>) -> Result<T> {
    let mut file = File::open(path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    let obj = serde_json::from_str(&contents)?;
    Ok(obj)
}

/// Timing utilities
pub mod timing {
    use std::time::Instant;
    use tracing::debug;

    /// Logs the lifetime of a build phase when dropped
    pub struct Timer {
        start: Instant,
        name: String,
    }

    impl Timer {
        /// Start new timer
        pub fn new(name: &str) -> Self {
            Timer {
                start: Instant::now(),
                name: name.to_string(),
            }
        }

        /// Seconds since the timer started
        pub fn elapsed(&self) -> f64 {
            self.start.elapsed().as_secs_f64()
        }
    }

    impl Drop for Timer {
        fn drop(&mut self) {
            debug!(phase = %self.name, seconds = self.elapsed(), "phase finished");
        }
    }
}

/// Seeded random knowledge bases for benchmarks and property tests
pub mod synthetic {
    use crate::ontology::FactBase;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Shape of a generated knowledge base
    #[derive(Clone, Copy, Debug)]
    pub struct Shape {
        /// Number of individuals
        pub individuals: usize,
        /// Number of atomic classes
        pub classes: usize,
        /// Number of roles
        pub roles: usize,
        /// Role assertions per individual, at most
        pub fan_out: usize,
    }

    impl Default for Shape {
        fn default() -> Self {
            Shape {
                individuals: 50,
                classes: 8,
                roles: 2,
                fan_out: 2,
            }
        }
    }

    /// Random fact base: classes form a forest, every individual gets one
    /// class and up to `fan_out` role successors
    pub fn random_fact_base(seed: u64, shape: Shape) -> FactBase {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut kb = FactBase::new();
        let class = |i: usize| format!("C{}", i);
        let role = |i: usize| format!("r{}", i);
        let individual = |i: usize| format!("i{}", i);

        for c in 0..shape.classes {
            kb.add_class(class(c));
            // a parent with a smaller index keeps the taxonomy acyclic
            if c > 0 && rng.gen_bool(0.6) {
                let parent = rng.gen_range(0..c);
                kb.add_subclass(class(c), class(parent));
            }
        }
        for r in 0..shape.roles {
            kb.add_role(role(r));
        }
        for i in 0..shape.individuals {
            kb.add_individual(individual(i));
            if shape.classes > 0 {
                kb.assert_class(individual(i), class(rng.gen_range(0..shape.classes)));
            }
            if shape.roles == 0 || shape.individuals < 2 {
                continue;
            }
            for _ in 0..rng.gen_range(0..=shape.fan_out) {
                let target = rng.gen_range(0..shape.individuals);
                if target != i {
                    kb.assert_role(individual(i), role(rng.gen_range(0..shape.roles)), individual(target));
                }
            }
        }
        kb
    }
}
