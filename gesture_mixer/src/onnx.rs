//! ONNX hand-landmark model (feature `onnx`).
//!
//! The model sees one hand per square input, so each frame is split into a
//! left and a right half and each half is run separately. Per half the model
//! returns 21 `(x, y, z)` points in input pixels, a presence score and a
//! handedness score (probability of a right hand, mirrored-selfie
//! convention).
//!
//! Crop geometry, preprocessing and output decoding are plain functions so
//! they can be tested without the runtime.

use std::time::Duration;

use hand_gesture::{HandObservation, HandSide, Landmark, Landmarks, LANDMARK_COUNT};

use crate::camera::Frame;

/// A rectangle of the frame fed to the model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Crop {
    pub x:      usize,
    pub y:      usize,
    pub width:  usize,
    pub height: usize,
}

/// The left and right halves of a `width` × `height` frame.
pub fn half_crops(width: usize, height: usize) -> [Crop; 2] {
    let half = width / 2;
    [
        Crop { x: 0,    y: 0, width: half,         height },
        Crop { x: half, y: 0, width: width - half, height },
    ]
}

/// Nearest-neighbour resize of `crop` to `size` × `size`, RGB in `[0, 1]`,
/// laid out NHWC.
pub fn preprocess_nhwc(frame: &Frame, crop: Crop, size: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(size * size * 3);
    let x_ratio = crop.width as f32 / size as f32;
    let y_ratio = crop.height as f32 / size as f32;
    for y in 0..size {
        let sy = crop.y + ((y as f32 + 0.5) * y_ratio) as usize;
        for x in 0..size {
            let sx = crop.x + ((x as f32 + 0.5) * x_ratio) as usize;
            let p = frame.pixel(sx, sy);
            out.push(((p >> 16) & 0xFF) as f32 / 255.0);
            out.push(((p >> 8) & 0xFF) as f32 / 255.0);
            out.push((p & 0xFF) as f32 / 255.0);
        }
    }
    out
}

fn probability(v: f32) -> f32 {
    if (0.0..=1.0).contains(&v) {
        v
    } else {
        1.0 / (1.0 + (-v).exp())
    }
}

/// Turn one half's raw outputs into an observation in normalised frame
/// coordinates. `None` when the model found no hand.
pub fn decode_hand(
    points:     &[f32],
    presence:   f32,
    handedness: f32,
    crop:       Crop,
    frame_size: (usize, usize),
    input_size: usize,
    timestamp:  Duration,
) -> Option<HandObservation> {
    if points.len() < LANDMARK_COUNT * 3 || frame_size.0 == 0 || frame_size.1 == 0 {
        return None;
    }
    let confidence = probability(presence);
    if confidence <= 0.0 {
        return None;
    }
    let side = if probability(handedness) > 0.5 { HandSide::Right } else { HandSide::Left };

    let (fw, fh) = (frame_size.0 as f32, frame_size.1 as f32);
    let scale = input_size.max(1) as f32;
    let mut landmarks: Landmarks = [Landmark::default(); LANDMARK_COUNT];
    for (i, lm) in landmarks.iter_mut().enumerate() {
        let (px, py, pz) = (points[i * 3], points[i * 3 + 1], points[i * 3 + 2]);
        *lm = Landmark::new(
            (crop.x as f32 + px / scale * crop.width as f32) / fw,
            (crop.y as f32 + py / scale * crop.height as f32) / fh,
            pz / scale,
        );
    }
    Some(HandObservation::new(side, landmarks, timestamp).with_confidence(confidence))
}

// ════════════════════════════════════════════════════════════════════════════
// OnnxLandmarkSource — ONNX Runtime session
// ════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "onnx")]
pub use self::runtime::OnnxLandmarkSource;

#[cfg(feature = "onnx")]
mod runtime {
    use ndarray::Array4;

    use hand_gesture::HandObservation;

    use super::{decode_hand, half_crops, preprocess_nhwc, Crop};
    use crate::camera::Frame;
    use crate::config::ModelConfig;
    use crate::landmarks::{LandmarkError, LandmarkSource};

    pub struct OnnxLandmarkSource {
        session:    ort::session::Session,
        input_size: usize,
        name:       String,
    }

    impl OnnxLandmarkSource {
        pub fn load(config: &ModelConfig) -> Result<Self, LandmarkError> {
            if !config.path.exists() {
                return Err(LandmarkError::ModelMissing(config.path.display().to_string()));
            }

            ort::init()
                .with_name("gesture_mixer")
                .commit()
                .map_err(|e| LandmarkError::Init(format!("Failed to initialize ORT: {}", e)))?;

            let session = ort::session::Session::builder()
                .map_err(|e| LandmarkError::Init(e.to_string()))?
                .with_intra_threads(config.intra_threads.max(1))
                .map_err(|e| LandmarkError::Init(e.to_string()))?
                .commit_from_file(&config.path)
                .map_err(|e| LandmarkError::Init(format!("Failed to load {:?}: {}", config.path, e)))?;

            log::info!("Loaded hand landmark model from {:?}", config.path);

            Ok(OnnxLandmarkSource {
                session,
                input_size: config.input_size as usize,
                name: format!("onnx ({})", config.path.display()),
            })
        }

        fn run_half(&mut self, frame: &Frame, crop: Crop) -> Result<Option<HandObservation>, LandmarkError> {
            let size = self.input_size;
            let input = preprocess_nhwc(frame, crop, size);
            let input_array = Array4::from_shape_vec((1, size, size, 3), input)
                .map_err(|e| LandmarkError::Inference(format!("Failed to create input array: {}", e)))?;
            let input_tensor = ort::value::Tensor::from_array(input_array)
                .map_err(|e| LandmarkError::Inference(format!("Failed to create tensor: {}", e)))?;

            let outputs = self
                .session
                .run(ort::inputs![input_tensor])
                .map_err(|e| LandmarkError::Inference(e.to_string()))?;

            // Outputs in model order: landmarks (63+), presence, handedness.
            let mut points: Option<Vec<f32>> = None;
            let mut scalars: Vec<f32> = Vec::with_capacity(2);
            for output in outputs.iter() {
                let (_shape, data) = output
                    .1
                    .try_extract_tensor::<f32>()
                    .map_err(|e| LandmarkError::Inference(format!("Failed to extract output: {}", e)))?;
                if data.len() == 1 {
                    scalars.push(data[0]);
                } else if points.is_none() && data.len() >= 63 {
                    points = Some(data[..63].to_vec());
                }
            }

            let points = points.ok_or_else(|| LandmarkError::Inference("no landmark output".to_string()))?;
            let presence = scalars.first().copied().unwrap_or(0.0);
            let handedness = scalars.get(1).copied().unwrap_or(0.5);
            Ok(decode_hand(
                &points,
                presence,
                handedness,
                crop,
                (frame.width, frame.height),
                size,
                frame.timestamp,
            ))
        }
    }

    impl LandmarkSource for OnnxLandmarkSource {
        fn detect(&mut self, frame: &Frame) -> Result<Vec<HandObservation>, LandmarkError> {
            let mut hands = Vec::with_capacity(2);
            for crop in half_crops(frame.width, frame.height) {
                if let Some(hand) = self.run_half(frame, crop)? {
                    hands.push(hand);
                }
            }
            Ok(hands)
        }

        fn name(&self) -> &str {
            &self.name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn halves_cover_odd_widths() {
        let [l, r] = half_crops(641, 480);
        assert_eq!(l, Crop { x: 0, y: 0, width: 320, height: 480 });
        assert_eq!(r, Crop { x: 320, y: 0, width: 321, height: 480 });
    }

    #[test]
    fn preprocess_samples_the_crop() {
        let mut frame = Frame::blank(4, 2, Duration::ZERO);
        // Right half red, left half blue
        for y in 0..2 {
            for x in 0..4 {
                frame.pixels[y * 4 + x] = if x >= 2 { 0xFF0000 } else { 0x0000FF };
            }
        }
        let [left, right] = half_crops(4, 2);
        let r = preprocess_nhwc(&frame, right, 2);
        assert_eq!(r.len(), 12);
        assert_eq!(&r[..3], &[1.0, 0.0, 0.0]);
        let l = preprocess_nhwc(&frame, left, 2);
        assert_eq!(&l[9..], &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn decode_maps_back_into_frame_coordinates() {
        let mut points = vec![0.0f32; 63];
        // Wrist at the centre of the model input
        points[0] = 112.0;
        points[1] = 112.0;
        let crop = half_crops(640, 480)[1];
        let obs = decode_hand(&points, 0.9, 0.8, crop, (640, 480), 224, Duration::from_millis(5)).unwrap();
        assert_eq!(obs.side, HandSide::Right);
        assert!((obs.wrist().x - 0.75).abs() < 1e-6);
        assert!((obs.wrist().y - 0.5).abs() < 1e-6);
        assert!((obs.confidence - 0.9).abs() < 1e-6);
        assert_eq!(obs.timestamp, Duration::from_millis(5));
    }

    #[test]
    fn logits_are_squashed() {
        let points = vec![0.0f32; 63];
        let crop = half_crops(10, 10)[0];
        let obs = decode_hand(&points, 4.0, -3.0, crop, (10, 10), 224, Duration::ZERO).unwrap();
        assert_eq!(obs.side, HandSide::Left);
        assert!(obs.confidence > 0.98 && obs.confidence < 1.0);
    }

    #[test]
    fn short_output_is_no_hand() {
        let crop = half_crops(10, 10)[0];
        assert!(decode_hand(&[0.0; 10], 0.9, 0.9, crop, (10, 10), 224, Duration::ZERO).is_none());
        assert!(decode_hand(&[0.0; 63], 0.0, 0.9, crop, (10, 10), 224, Duration::ZERO).is_none());
    }
}
