use ndarray::{s, Array3, Axis};

/// Velocity is only ever computed over the image-plane axes.
pub const VELOCITY_AXES: usize = 2;

/// Per-joint velocity by finite differences, same `(frame, joint, axis)` shape
/// as the input (truncated to [`VELOCITY_AXES`] axes).
///
/// Interior frames use the central difference `(p[t+1] - p[t-1]) / 2Δt`; the
/// first and last frames use forward/backward differences so no frame is dropped.
/// A single-frame sequence has zero velocity.
pub fn estimate(positions: &Array3<f64>, fps: f64) -> Array3<f64> {
    let axes = positions.len_of(Axis(2)).min(VELOCITY_AXES);
    let p = positions.slice(s![.., .., ..axes]);
    let n = p.len_of(Axis(0));
    let mut v = Array3::<f64>::zeros(p.raw_dim());
    if n < 2 {
        return v;
    }

    let dt = 1.0 / fps;
    for t in 0..n {
        let (prev, next, span) = if t == 0 {
            (0, 1, dt)
        } else if t == n - 1 {
            (n - 2, n - 1, dt)
        } else {
            (t - 1, t + 1, 2.0 * dt)
        };
        let diff = (&p.index_axis(Axis(0), next) - &p.index_axis(Axis(0), prev)) / span;
        v.index_axis_mut(Axis(0), t).assign(&diff);
    }
    v
}

/// Mean joint speed (velocity magnitude averaged over joints) for every frame.
pub fn mean_speed(velocity: &Array3<f64>) -> Vec<f64> {
    velocity
        .axis_iter(Axis(0))
        .map(|frame| {
            let joints = frame.len_of(Axis(0));
            if joints == 0 {
                return 0.0;
            }
            let total: f64 = frame
                .axis_iter(Axis(0))
                .map(|joint| joint.iter().map(|x| x * x).sum::<f64>().sqrt())
                .sum();
            total / joints as f64
        })
        .collect()
}
