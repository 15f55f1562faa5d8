//! Wilder-smoothed technical indicators.
//!
//! Wilder smoothing: SMA seed over the first `period` valid values,
//! then `y_t = alpha * x_t + (1 - alpha) * y_{t-1}` with
//! `alpha = 1/period` (a decay span of `2*period - 1`).
//!
//! Invalid leading entries are NaN; a NaN mid-series poisons the rest
//! of the output rather than silently restarting the smoother.

use zo_core::Candle;

/// True Range series. `tr[0]` is NaN: without a previous close the
/// first bar has no proper true range, and marking it invalid keeps
/// TR aligned with the directional-movement series.
pub fn true_range(candles: &[Candle]) -> Vec<f64> {
    let n = candles.len();
    let mut tr = vec![f64::NAN; n];
    for i in 1..n {
        let high = candles[i].high;
        let low = candles[i].low;
        let prev_close = candles[i - 1].close;
        tr[i] = (high - low)
            .max((high - prev_close).abs())
            .max((low - prev_close).abs());
    }
    tr
}

/// Directional movement per Wilder: the larger positive directional
/// move wins the bar, the other is zero; neither if both are negative
/// or they tie.
pub fn directional_movement(candles: &[Candle]) -> (Vec<f64>, Vec<f64>) {
    let n = candles.len();
    let mut plus_dm = vec![f64::NAN; n];
    let mut minus_dm = vec![f64::NAN; n];
    for i in 1..n {
        let up_move = candles[i].high - candles[i - 1].high;
        let down_move = candles[i - 1].low - candles[i].low;

        plus_dm[i] = if up_move > down_move && up_move > 0.0 {
            up_move
        } else {
            0.0
        };
        minus_dm[i] = if down_move > up_move && down_move > 0.0 {
            down_move
        } else {
            0.0
        };
    }
    (plus_dm, minus_dm)
}

/// Apply Wilder smoothing to a series. Alpha = 1/period.
/// Seed: mean of the first `period` consecutive valid values.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }

    // first index with `period` consecutive valid values
    let seed_start = (0..n).find(|&i| {
        i + period <= n && values[i..i + period].iter().all(|v| !v.is_nan())
    });
    let Some(seed_start) = seed_start else {
        return result;
    };
    let seed_end = seed_start + period;

    let seed: f64 = values[seed_start..seed_end].iter().sum::<f64>() / period as f64;
    result[seed_end - 1] = seed;

    let alpha = 1.0 / period as f64;
    let mut prev = seed;
    for i in seed_end..n {
        if values[i].is_nan() {
            return result;
        }
        let smoothed = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = smoothed;
        prev = smoothed;
    }
    result
}

/// Relative Strength Index.
///
/// Seed: SMA of gains/losses over the first `period` diffs. Then the
/// Wilder recursion `avg_t = (avg_{t-1} * (period - 1) + x_t) / period`.
/// `avg_loss = 0` maps to 100 (a loss-free window is maximally
/// overbought, flat included).
pub fn rsi(closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period + 1 {
        return result;
    }

    let mut gains = Vec::with_capacity(n - 1);
    let mut losses = Vec::with_capacity(n - 1);
    for i in 1..n {
        let change = closes[i] - closes[i - 1];
        gains.push(change.max(0.0));
        losses.push((-change).max(0.0));
    }

    let mut avg_gain: f64 = gains[..period].iter().sum::<f64>() / period as f64;
    let mut avg_loss: f64 = losses[..period].iter().sum::<f64>() / period as f64;
    result[period] = rsi_value(avg_gain, avg_loss);

    for i in period..gains.len() {
        avg_gain = (avg_gain * (period as f64 - 1.0) + gains[i]) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + losses[i]) / period as f64;
        result[i + 1] = rsi_value(avg_gain, avg_loss);
    }
    result
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

/// Average Directional Index, Wilder smoothing throughout.
///
/// TR, +DM and -DM are Wilder-smoothed; +DI/-DI are ratios to smoothed
/// TR; DX is the normalized DI spread; ADX is Wilder-smoothed DX. The
/// first valid value appears at index `2*period - 1` relative to the
/// first valid TR. Smoothing the directional components with an SMA or
/// a standard EMA instead inflates the result roughly 2x; tests pin
/// the Wilder discipline.
pub fn adx(candles: &[Candle], period: usize) -> Vec<f64> {
    let n = candles.len();
    let tr = true_range(candles);
    let (plus_dm, minus_dm) = directional_movement(candles);

    let smooth_tr = wilder_smooth(&tr, period);
    let smooth_plus = wilder_smooth(&plus_dm, period);
    let smooth_minus = wilder_smooth(&minus_dm, period);

    let mut dx = vec![f64::NAN; n];
    for i in 0..n {
        if smooth_tr[i].is_nan()
            || smooth_plus[i].is_nan()
            || smooth_minus[i].is_nan()
            || smooth_tr[i] == 0.0
        {
            continue;
        }
        let plus_di = 100.0 * smooth_plus[i] / smooth_tr[i];
        let minus_di = 100.0 * smooth_minus[i] / smooth_tr[i];
        let di_sum = plus_di + minus_di;
        dx[i] = if di_sum == 0.0 {
            0.0
        } else {
            100.0 * (plus_di - minus_di).abs() / di_sum
        };
    }

    wilder_smooth(&dx, period)
}

/// Last valid value of an indicator series.
pub fn last_valid(series: &[f64]) -> Option<f64> {
    series.iter().rev().find(|v| !v.is_nan()).copied()
}
