//! CPU reference animator.

use super::{
    bucket_range, decay_value, smoothstep, AnimationState, AnimatorError, PeakAnimator,
    TickParams,
};
use crate::audio::StagingSnapshot;

/// Runs the decay and update passes over a CPU-resident [`AnimationState`].
#[derive(Debug, Clone)]
pub struct CpuAnimator {
    state: AnimationState,
}

impl CpuAnimator {
    pub fn new(instance_count: u32) -> Self {
        Self {
            state: AnimationState::new(instance_count),
        }
    }

    pub fn state(&self) -> &AnimationState {
        &self.state
    }
}

impl PeakAnimator for CpuAnimator {
    fn instance_count(&self) -> u32 {
        self.state.len() as u32
    }

    fn decay(&mut self, params: &TickParams) -> Result<(), AnimatorError> {
        self.check_instance_count(params)?;
        let progress_now = params.window_progress();
        let state = &mut self.state;

        for i in 0..state.len() {
            let mut old = decay_value(state.old_peak[i], params.decay_factor);
            if params.fresh_push {
                old = old.max(state.target_peak[i] * smoothstep(state.progress[i]));
            } else if state.initialized[i] {
                state.progress[i] = progress_now;
                if progress_now >= 1.0 {
                    state.target_peak[i] = decay_value(state.target_peak[i], params.decay_factor);
                }
            }
            state.old_peak[i] = old;
        }
        Ok(())
    }

    fn update(
        &mut self,
        params: &TickParams,
        snapshot: &StagingSnapshot,
    ) -> Result<(), AnimatorError> {
        self.check_instance_count(params)?;
        let n = params.instance_count;
        let progress = params.window_progress();

        for i in 0..n {
            let (start, end) = bucket_range(i, n, snapshot.sample_count);
            let i = i as usize;
            self.state.target_peak[i] = snapshot.bucket_peak(start, end);
            self.state.progress[i] = progress;
            self.state.initialized[i] = true;
        }
        Ok(())
    }

    fn read_state(&self) -> Result<AnimationState, AnimatorError> {
        Ok(self.state.clone())
    }

    fn reset(&mut self) -> Result<(), AnimatorError> {
        self.state = AnimationState::new(self.instance_count());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SampleFormat;

    fn params(now: f32, fresh_push: bool, instance_count: u32) -> TickParams {
        TickParams {
            now,
            window_start: 0.0,
            window_duration: 0.5,
            decay_factor: 0.9,
            instance_count,
            fresh_push,
        }
    }

    fn snapshot_f32(samples: &[f32]) -> StagingSnapshot {
        StagingSnapshot {
            bytes: bytemuck::cast_slice(samples).to_vec(),
            format: SampleFormat::Float32,
            sample_count: samples.len(),
            window_start: 0.0,
            generation: 1,
        }
    }

    #[test]
    fn test_update_sets_bucket_peaks() {
        let mut animator = CpuAnimator::new(2);
        let snapshot = snapshot_f32(&[0.1, -0.6, 0.3, 0.2]);
        animator.step(&params(0.0, true, 2), Some(&snapshot)).unwrap();

        let state = animator.state();
        assert_eq!(state.target_peak, vec![0.6, 0.3]);
        assert_eq!(state.initialized, vec![true, true]);
        assert_eq!(state.progress, vec![0.0, 0.0]);
        assert_eq!(state.old_peak, vec![0.0, 0.0]);
    }

    #[test]
    fn test_int16_update_normalizes() {
        let mut animator = CpuAnimator::new(1);
        let samples = [i16::MIN, 100];
        let snapshot = StagingSnapshot {
            bytes: bytemuck::cast_slice(&samples).to_vec(),
            format: SampleFormat::Int16,
            sample_count: 2,
            window_start: 0.0,
            generation: 1,
        };
        animator.update(&params(0.0, true, 1), &snapshot).unwrap();
        assert_eq!(animator.state().target_peak[0], 1.0);
    }

    #[test]
    fn test_progress_advances_then_target_ages() {
        let mut animator = CpuAnimator::new(1);
        animator
            .step(&params(0.0, true, 1), Some(&snapshot_f32(&[0.8])))
            .unwrap();

        animator.step(&params(0.25, false, 1), None).unwrap();
        assert!((animator.state().progress[0] - 0.5).abs() < 1e-6);
        assert_eq!(animator.state().target_peak[0], 0.8);

        animator.step(&params(1.0, false, 1), None).unwrap();
        assert_eq!(animator.state().progress[0], 1.0);
        assert!((animator.state().target_peak[0] - 0.72).abs() < 1e-6);
    }

    #[test]
    fn test_fresh_push_captures_displayed_amplitude() {
        let mut animator = CpuAnimator::new(1);
        animator
            .step(&params(0.0, true, 1), Some(&snapshot_f32(&[0.8])))
            .unwrap();
        animator.step(&params(1.0, false, 1), None).unwrap();
        let shown = animator.state().displayed_amplitude(0);

        let quiet = StagingSnapshot {
            window_start: 1.0,
            ..snapshot_f32(&[0.0])
        };
        let mut tick = params(1.0, true, 1);
        tick.window_start = 1.0;
        animator.step(&tick, Some(&quiet)).unwrap();

        let state = animator.state();
        assert_eq!(state.target_peak[0], 0.0);
        assert!((state.old_peak[0] - shown).abs() < 1e-6);
    }

    #[test]
    fn test_decay_without_pushes_is_monotonic() {
        let mut animator = CpuAnimator::new(4);
        animator
            .step(&params(0.0, true, 4), Some(&snapshot_f32(&[1.0, 0.5, 0.25, 0.1])))
            .unwrap();
        animator.step(&params(0.5, false, 4), None).unwrap();
        animator
            .step(&params(0.5, true, 4), Some(&snapshot_f32(&[0.0; 4])))
            .unwrap();

        let mut previous = animator.state().old_peak.clone();
        for tick in 0..200 {
            animator
                .step(&params(1.0 + tick as f32 * 0.016, false, 4), None)
                .unwrap();
            let current = &animator.state().old_peak;
            for (now, before) in current.iter().zip(&previous) {
                assert!(*now <= *before);
                assert!(*now >= 0.0);
            }
            previous = current.clone();
        }
        assert!(previous.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_instance_count_mismatch() {
        let mut animator = CpuAnimator::new(2);
        let result = animator.decay(&params(0.0, false, 3));
        assert!(matches!(
            result,
            Err(AnimatorError::InstanceCountMismatch { expected: 2, got: 3 })
        ));
    }

    #[test]
    fn test_reset_zeroes_state() {
        let mut animator = CpuAnimator::new(2);
        animator
            .step(&params(0.0, true, 2), Some(&snapshot_f32(&[0.5, 0.5])))
            .unwrap();
        animator.reset().unwrap();
        assert_eq!(animator.state(), &AnimationState::new(2));
    }
}
