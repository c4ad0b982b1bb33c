use crate::util::constants::*;
use std::default::Default;
use strum_macros::{EnumString, IntoStaticStr};

/// Which collector to run.
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumString, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum GcType {
    /// Generational collector: copying young collection plus concurrent tenured mark-sweep.
    GenGc,
    /// Stop-the-world mark-sweep over a single space.
    Stw,
}

/// Which policy decides that the heap is full enough to collect.
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumString, IntoStaticStr)]
pub enum GcTriggerType {
    #[strum(serialize = "heap-trigger")]
    HeapTrigger,
    #[strum(serialize = "debug")]
    DebugTrigger,
}

/// The default size of the tenured space (or of the whole heap for the STW collector).
pub const DEFAULT_HEAP_SIZE: usize = 64 << LOG_BYTES_IN_MBYTE;
/// The default size of the young space.
pub const DEFAULT_YOUNG_SPACE_SIZE: usize = 4 << LOG_BYTES_IN_MBYTE;
/// The default size of a tenured memory pool.
pub const DEFAULT_POOL_SIZE: usize = 256 << LOG_BYTES_IN_KBYTE;
/// Objects larger than this are allocated directly in tenured.
pub const DEFAULT_MAX_YOUNG_ALLOC_SIZE: usize = 16 << LOG_BYTES_IN_KBYTE;
/// The heap size used to compute the first target footprint of the heap trigger.
pub const DEFAULT_MIN_HEAP_SIZE_FOR_TRIGGER: usize = 8 << LOG_BYTES_IN_MBYTE;
pub const DEFAULT_PERCENT_THRESHOLD: usize = 10;
pub const DEFAULT_MIN_EXTEND_SIZE: usize = 1 << LOG_BYTES_IN_MBYTE;
pub const DEFAULT_MAX_EXTEND_SIZE: usize = 8 << LOG_BYTES_IN_MBYTE;

fn always_valid<T>(_: &T) -> bool {
    true
}

fn card_aligned_and_positive(v: &usize) -> bool {
    *v > 0 && v % BYTES_IN_CARD == 0
}

macro_rules! options {
    ($($name:ident: $type:ty[$validator:expr] = $default:expr),*,) => [
        options!($($name: $type[$validator] = $default),*);
    ];
    ($($name:ident: $type:ty[$validator:expr] = $default:expr),*) => [
        #[derive(Clone, Debug)]
        pub struct Options {
            $(pub $name: $type),*
        }
        impl Options {
            /// Set an option by its snake case name. Returns false (and keeps the old value)
            /// if the value cannot be parsed or is rejected by the validator.
            pub fn set_from_str(&mut self, s: &str, val: &str)->bool {
                match s {
                    // Parse the given value from str (by env vars or by calling process()) to the right type
                    $(stringify!($name) => if let Ok(ref val) = val.parse::<$type>() {
                        // Validate
                        let validate_fn = $validator;
                        let is_valid = validate_fn(val);
                        if is_valid {
                            // Only set value if valid.
                            self.$name = val.clone();
                        } else {
                            eprintln!("Warn: unable to set {}={:?}. Invalid value. Default value will be used.", s, val);
                        }
                        is_valid
                    } else {
                        eprintln!("Warn: unable to set {}={:?}. Cant parse value. Default value will be used.", s, val);
                        false
                    })*
                    _ => panic!("Invalid Options key: {}", s)
                }
            }

            /// Create options with the built-in defaults, ignoring environment variables.
            pub fn builtin_defaults() -> Self {
                Options {
                    $($name: $default),*
                }
            }
        }
        impl Default for Options {
            fn default() -> Self {
                let mut options = Self::builtin_defaults();

                // If we have env vars that start with GENGC_ and match any option (such as GENGC_GC_TYPE),
                // we set the option to its value (if it is a valid value). Otherwise, use the default value.
                const PREFIX: &str = "GENGC_";
                for (key, val) in std::env::vars() {
                    // strip the prefix, and get the lower case string
                    if let Some(rest_of_key) = key.strip_prefix(PREFIX) {
                        let lowercase: &str = &rest_of_key.to_lowercase();
                        match lowercase {
                            $(stringify!($name) => { options.set_from_str(lowercase, &val); },)*
                            _ => {}
                        }
                    }
                }
                options
            }
        }
    ]
}

options! {
    // The collector to use.
    gc_type:                      GcType        [always_valid] = GcType::GenGc,
    // Size of the tenured space (the whole heap for the STW collector).
    heap_size:                    usize         [card_aligned_and_positive] = DEFAULT_HEAP_SIZE,
    // Size of the young space. Ignored by the STW collector.
    young_space_size:             usize         [card_aligned_and_positive] = DEFAULT_YOUNG_SPACE_SIZE,
    // Granule in which tenured memory is taken from and returned to the pool manager.
    pool_size:                    usize         [|v: &usize| card_aligned_and_positive(v) && v.is_power_of_two()] = DEFAULT_POOL_SIZE,
    // Objects larger than this skip the young space.
    max_young_alloc_size:         usize         [|v: &usize| *v >= MIN_OBJECT_SIZE] = DEFAULT_MAX_YOUNG_ALLOC_SIZE,
    // Let mutators run during concurrent mark and sweep. If false, those phases run inside the pause.
    concurrency_enabled:          bool          [always_valid] = true,
    // A tenured collection requested by a qualifying cause runs once more than this many young collections have happened since the last one.
    major_gc_period:              usize         [always_valid] = 0,
    // Verify the heap before every collection.
    pre_gc_heap_verification:     bool          [always_valid] = false,
    // Verify the heap after every collection.
    post_gc_heap_verification:    bool          [always_valid] = false,
    // Abort if a heap verification finds any failure.
    fail_on_heap_verification:    bool          [always_valid] = false,
    // The policy that triggers threshold collections.
    gc_trigger_type:              GcTriggerType [always_valid] = GcTriggerType::HeapTrigger,
    // Heap size used to compute the initial target footprint of the heap trigger.
    min_heap_size_for_trigger:    usize         [|v: &usize| *v >= 100] = DEFAULT_MIN_HEAP_SIZE_FOR_TRIGGER,
    // Percentage of the heap used to compute the target footprint.
    gc_trigger_percent_threshold: usize         [|v: &usize| *v > 0 && *v <= 100] = DEFAULT_PERCENT_THRESHOLD,
    // Lower bound of the target footprint extension after a collection.
    min_extend_size:              usize         [always_valid] = DEFAULT_MIN_EXTEND_SIZE,
    // Upper bound of the target footprint extension after a collection that grew the heap.
    max_extend_size:              usize         [always_valid] = DEFAULT_MAX_EXTEND_SIZE,
    // Number of threshold checks the heap trigger ignores at startup.
    skip_startup_gc_count:        usize         [always_valid] = 0,
    // The debug trigger fires on every check from this one on.
    debug_trigger_start:          usize         [always_valid] = 0,
}

impl Options {
    /// Set an option by its camel case name, as a VM command line usually spells it (e.g. `gcType`).
    pub fn set_from_camelcase_str(&mut self, s: &str, val: &str) -> bool {
        trace!("Trying to process option pair: ({}, {})", s, val);

        let mut sr = String::with_capacity(s.len());
        for c in s.chars() {
            if c.is_uppercase() {
                sr.push('_');
                for c in c.to_lowercase() {
                    sr.push(c);
                }
            } else {
                sr.push(c)
            }
        }

        let result = self.set_from_str(sr.as_str(), val);

        trace!("Trying to process option pair: ({})", sr);

        if result {
            trace!("Validation passed");
        } else {
            trace!("Validation failed")
        }
        result
    }

    /// Check the constraints between options, and fix them up if they are violated.
    pub fn validate_layout(&mut self) {
        if self.max_young_alloc_size > self.pool_size / 2 {
            warn!(
                "max_young_alloc_size {} exceeds half of pool_size {}. Using {}.",
                self.max_young_alloc_size,
                self.pool_size,
                self.pool_size / 2
            );
            self.max_young_alloc_size = self.pool_size / 2;
        }
        if self.max_young_alloc_size > self.young_space_size {
            warn!(
                "max_young_alloc_size {} exceeds young_space_size {}. Using {}.",
                self.max_young_alloc_size, self.young_space_size, self.young_space_size
            );
            self.max_young_alloc_size = self.young_space_size;
        }
        if self.heap_size < self.pool_size {
            warn!(
                "heap_size {} is smaller than one pool. Using {}.",
                self.heap_size, self.pool_size
            );
            self.heap_size = self.pool_size;
        }
        if self.heap_size % self.pool_size != 0 {
            let aligned = crate::util::conversions::raw_align_down(self.heap_size, self.pool_size);
            warn!(
                "heap_size {} is not a multiple of pool_size {}. Using {}.",
                self.heap_size, self.pool_size, aligned
            );
            self.heap_size = aligned;
        }
    }

    pub fn is_generational(&self) -> bool {
        self.gc_type == GcType::GenGc
    }
}
