//! Debugging feature flags.
//!
//! Toggle individual diagnostics here; keep them `false` by default so release
//! builds remain quiet. Every flag is additionally gated by `cfg(debug_assertions)`.

pub struct DebugFlags {
    /// Emit the full instruction text sent to the AI provider for each timeframe.
    pub print_prompts: bool,
    /// Emit the raw JSON returned by the provider before schema checks.
    pub print_raw_responses: bool,
    /// Emit calibration mode and pixel placement for every rendered zone.
    pub print_geometry: bool,
    /// Emit every progress checkpoint, even when no sink is attached.
    pub print_progress: bool,
}

pub const DEBUG_FLAGS: DebugFlags = DebugFlags {
    print_prompts: false,
    print_raw_responses: false,
    print_geometry: false,
    print_progress: true,
};
