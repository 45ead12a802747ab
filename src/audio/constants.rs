//! Central constants for the client-side audio graph and visualizer.

// ── Analysis ─────────────────────────────────────────────────────────────────

/// Default analyser window. Yields `DEFAULT_FFT_SIZE / 2` samples per read.
pub const DEFAULT_FFT_SIZE: usize = 256;

/// Analyser window bounds, matching the platform's accepted range.
pub const MIN_FFT_SIZE: usize = 32;
pub const MAX_FFT_SIZE: usize = 32_768;

/// Midpoint of unsigned 8-bit time-domain samples (silence).
pub const BYTE_CENTER: f32 = 128.0;

// ── Visual mapping ───────────────────────────────────────────────────────────

/// Scale applied to the indicators whenever audio is not playing.
pub const NEUTRAL_SCALE: f32 = 1.0;

/// `scale = 1 + rms * K`.
pub const DEFAULT_SENSITIVITY: f32 = 5.0;

// ── Rendering ────────────────────────────────────────────────────────────────

/// Frames per render quantum pulled by the output context.
pub const RENDER_QUANTUM_FRAMES: usize = 128;

/// Interleaved stereo throughout the graph.
pub const GRAPH_CHANNELS: usize = 2;
