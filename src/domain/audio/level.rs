//! Live level and spectrum analysis for the recording meter

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// FFT window size for spectrum analysis
pub const SPECTRUM_WINDOW: usize = 1024;

/// Default number of spectrum bars
pub const DEFAULT_SPECTRUM_BARS: usize = 16;

/// Levels at or below this are drawn as empty
const FLOOR_DB: f32 = -60.0;

/// Lowest frequency shown by the spectrum
const MIN_FREQUENCY_HZ: f32 = 60.0;

/// What the meter should display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisualizationMode {
    Off,
    #[default]
    Level,
    Spectrum {
        bars: usize,
    },
}

impl VisualizationMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Level => "level",
            Self::Spectrum { .. } => "spectrum",
        }
    }

    /// Override the bar count for spectrum mode
    pub fn with_bars(self, bars: usize) -> Self {
        match self {
            Self::Spectrum { .. } => Self::Spectrum { bars: bars.max(1) },
            other => other,
        }
    }
}

impl FromStr for VisualizationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "off" | "none" => Ok(Self::Off),
            "level" | "bar" => Ok(Self::Level),
            "spectrum" | "bars" => Ok(Self::Spectrum {
                bars: DEFAULT_SPECTRUM_BARS,
            }),
            other => Err(format!(
                "Invalid visualizer \"{}\". Valid values are: off, level, spectrum",
                other
            )),
        }
    }
}

impl fmt::Display for VisualizationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One meter reading, each value normalised to `[0, 1]`
#[derive(Debug, Clone, PartialEq)]
pub enum LevelSample {
    Level(f32),
    Spectrum(Vec<f32>),
}

impl LevelSample {
    /// Flat reading shown while paused or stopped
    pub fn silent(mode: VisualizationMode) -> Self {
        match mode {
            VisualizationMode::Spectrum { bars } => Self::Spectrum(vec![0.0; bars]),
            _ => Self::Level(0.0),
        }
    }

    /// Highest value in the reading
    pub fn peak(&self) -> f32 {
        match self {
            Self::Level(v) => *v,
            Self::Spectrum(bars) => bars.iter().copied().fold(0.0, f32::max),
        }
    }
}

/// Derives meter readings from captured PCM frames.
///
/// Holds only the FFT plan and window; every reading is computed from the
/// frame passed in.
pub struct AudioLevelAnalyzer {
    mode: VisualizationMode,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
}

impl AudioLevelAnalyzer {
    pub fn new(mode: VisualizationMode) -> Self {
        let fft = FftPlanner::new().plan_fft_forward(SPECTRUM_WINDOW);
        let window = (0..SPECTRUM_WINDOW)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * i as f32 / (SPECTRUM_WINDOW - 1) as f32;
                0.5 - 0.5 * phase.cos()
            })
            .collect();

        Self { mode, fft, window }
    }

    pub fn mode(&self) -> VisualizationMode {
        self.mode
    }

    /// Analyse one frame of interleaved samples
    pub fn analyze(&self, samples: &[i16], channels: u16, sample_rate: u32) -> LevelSample {
        let mono = downmix(samples, channels);
        match self.mode {
            VisualizationMode::Spectrum { bars } => {
                LevelSample::Spectrum(self.spectrum(&mono, sample_rate, bars))
            }
            _ => LevelSample::Level(rms_level(&mono)),
        }
    }

    fn spectrum(&self, mono: &[f32], sample_rate: u32, bars: usize) -> Vec<f32> {
        if sample_rate == 0 || bars == 0 {
            return vec![0.0; bars];
        }

        let frame = &mono[mono.len().saturating_sub(SPECTRUM_WINDOW)..];
        let mut buffer: Vec<Complex<f32>> = (0..SPECTRUM_WINDOW)
            .map(|i| Complex::new(frame.get(i).copied().unwrap_or(0.0) * self.window[i], 0.0))
            .collect();
        self.fft.process(&mut buffer);

        // Hann coherent gain is 0.5, so a full-scale sine peaks at N/4
        let scale = 4.0 / SPECTRUM_WINDOW as f32;
        let half = SPECTRUM_WINDOW / 2;
        let magnitudes: Vec<f32> = buffer[..half].iter().map(|c| c.norm() * scale).collect();

        let bin_hz = sample_rate as f32 / SPECTRUM_WINDOW as f32;
        let edges = band_edges(bars, sample_rate);
        edges
            .windows(2)
            .map(|edge| {
                let lo = ((edge[0] / bin_hz).floor() as usize).clamp(1, half - 1);
                let hi = ((edge[1] / bin_hz).ceil() as usize).clamp(lo + 1, half);
                let peak = magnitudes[lo..hi].iter().copied().fold(0.0, f32::max);
                normalize_db(peak)
            })
            .collect()
    }
}

/// Log-spaced band boundaries from 60 Hz to Nyquist (`bars + 1` values)
pub fn band_edges(bars: usize, sample_rate: u32) -> Vec<f32> {
    let nyquist = sample_rate as f32 / 2.0;
    let low = MIN_FREQUENCY_HZ.min(nyquist / 2.0);
    let ratio = nyquist / low;
    (0..=bars)
        .map(|k| low * ratio.powf(k as f32 / bars.max(1) as f32))
        .collect()
}

/// RMS of a mono frame on the dBFS meter scale
pub fn rms_level(mono: &[f32]) -> f32 {
    if mono.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = mono.iter().map(|s| s * s).sum();
    normalize_db((sum_sq / mono.len() as f32).sqrt())
}

fn normalize_db(amplitude: f32) -> f32 {
    if amplitude <= 0.0 {
        return 0.0;
    }
    let db = 20.0 * amplitude.log10();
    ((db - FLOOR_DB) / -FLOOR_DB).clamp(0.0, 1.0)
}

fn downmix(samples: &[i16], channels: u16) -> Vec<f32> {
    let channels = channels.max(1) as usize;
    samples
        .chunks(channels)
        .map(|frame| {
            let sum: f32 = frame.iter().map(|&s| s as f32 / 32768.0).sum();
            sum / frame.len() as f32
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, amplitude: f32, sample_rate: u32, len: usize) -> Vec<i16> {
        (0..len)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                (amplitude * 32767.0 * (2.0 * std::f32::consts::PI * freq * t).sin()) as i16
            })
            .collect()
    }

    #[test]
    fn silence_is_zero_level() {
        let analyzer = AudioLevelAnalyzer::new(VisualizationMode::Level);
        assert_eq!(analyzer.analyze(&[0; 512], 1, 16_000), LevelSample::Level(0.0));
        assert_eq!(analyzer.analyze(&[], 1, 16_000), LevelSample::Level(0.0));
    }

    #[test]
    fn louder_signal_reads_higher() {
        let analyzer = AudioLevelAnalyzer::new(VisualizationMode::Level);
        let quiet = analyzer.analyze(&sine(440.0, 0.01, 16_000, 1600), 1, 16_000).peak();
        let loud = analyzer.analyze(&sine(440.0, 0.5, 16_000, 1600), 1, 16_000).peak();
        assert!(loud > quiet, "loud={} quiet={}", loud, quiet);
        assert!(loud <= 1.0);
    }

    #[test]
    fn stereo_is_downmixed() {
        let analyzer = AudioLevelAnalyzer::new(VisualizationMode::Level);
        // Left and right cancel out
        let frames: Vec<i16> = (0..800).flat_map(|_| [1000i16, -1000]).collect();
        assert_eq!(analyzer.analyze(&frames, 2, 16_000), LevelSample::Level(0.0));
    }

    #[test]
    fn spectrum_peaks_in_band_containing_tone() {
        let bars = 16;
        let analyzer = AudioLevelAnalyzer::new(VisualizationMode::Spectrum { bars });
        let reading = analyzer.analyze(&sine(1_000.0, 0.5, 16_000, 2048), 1, 16_000);

        let LevelSample::Spectrum(values) = reading else {
            panic!("expected spectrum");
        };
        assert_eq!(values.len(), bars);

        let loudest = values
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        let edges = band_edges(bars, 16_000);
        assert!(
            edges[loudest] <= 1_100.0 && edges[loudest + 1] >= 900.0,
            "band {} spans {}..{}",
            loudest,
            edges[loudest],
            edges[loudest + 1]
        );
        assert!(values[bars - 1] < values[loudest]);
    }

    #[test]
    fn silent_sample_matches_mode() {
        assert_eq!(
            LevelSample::silent(VisualizationMode::Spectrum { bars: 4 }),
            LevelSample::Spectrum(vec![0.0; 4])
        );
        assert_eq!(LevelSample::silent(VisualizationMode::Level), LevelSample::Level(0.0));
        assert_eq!(LevelSample::silent(VisualizationMode::Off), LevelSample::Level(0.0));
    }

    #[test]
    fn band_edges_are_increasing() {
        let edges = band_edges(8, 48_000);
        assert_eq!(edges.len(), 9);
        assert!(edges.windows(2).all(|w| w[0] < w[1]));
        assert!((edges[8] - 24_000.0).abs() < 1.0);
    }

    #[test]
    fn visualizer_parses() {
        assert_eq!("off".parse::<VisualizationMode>().unwrap(), VisualizationMode::Off);
        assert_eq!(
            "spectrum".parse::<VisualizationMode>().unwrap().with_bars(8),
            VisualizationMode::Spectrum { bars: 8 }
        );
        assert!("waveform".parse::<VisualizationMode>().is_err());
    }
}
