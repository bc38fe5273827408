//! 发布节流

use std::time::Duration;

use contracts::SimTime;

/// 按仿真时间节流
///
/// 时间以整数纳秒比较，`period == 0` 时每帧都放行。
/// 仿真时间回退 (世界重置) 时视为未经过任何时间。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    period: Duration,
    last_update: SimTime,
}

impl Throttle {
    /// 创建节流器，`last_update` 为起始时刻
    pub fn new(period: Duration, last_update: SimTime) -> Self {
        Self {
            period,
            last_update,
        }
    }

    /// 由发布频率创建 (0 表示不限速)
    pub fn from_rate(update_rate: f64, last_update: SimTime) -> Self {
        let period = if update_rate > 0.0 {
            Duration::try_from_secs_f64(1.0 / update_rate).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        };
        Self::new(period, last_update)
    }

    /// 最小发布间隔
    pub fn period(&self) -> Duration {
        self.period
    }

    /// 上一次发布的仿真时间
    pub fn last_update(&self) -> SimTime {
        self.last_update
    }

    /// 距上一次发布的时间
    pub fn elapsed(&self, now: SimTime) -> Duration {
        now.saturating_sub(self.last_update)
    }

    /// `now` 时刻是否允许发布
    pub fn ready(&self, now: SimTime) -> bool {
        self.elapsed(now) >= self.period
    }

    /// 记录一次发布
    pub fn mark(&mut self, now: SimTime) {
        self.last_update = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn test_zero_period_always_ready() {
        let throttle = Throttle::from_rate(0.0, ms(5000));
        assert_eq!(throttle.period(), Duration::ZERO);
        assert!(throttle.ready(ms(5000)));
        assert!(throttle.ready(ms(5000) + Duration::from_nanos(1)));
    }

    #[test]
    fn test_rate_gating() {
        let mut throttle = Throttle::from_rate(10.0, Duration::ZERO);
        assert_eq!(throttle.period(), ms(100));
        assert!(!throttle.ready(ms(50)));
        assert!(throttle.ready(ms(100)));

        throttle.mark(ms(100));
        assert_eq!(throttle.last_update(), ms(100));
        assert!(!throttle.ready(ms(150)));
        assert!(!throttle.ready(ms(200) - Duration::from_nanos(1)));
        assert!(throttle.ready(ms(200)));
    }

    #[test]
    fn test_thirds_of_a_period_accumulate_exactly() {
        // 30Hz 帧间隔与 10Hz 发布周期，第 3 帧恰好满一个周期
        let frame = |n: u64| Duration::from_nanos(n * 1_000_000_000 / 30);
        let mut throttle = Throttle::from_rate(10.0, Duration::ZERO);

        let mut published = Vec::new();
        for n in 1..=300 {
            if throttle.ready(frame(n)) {
                throttle.mark(frame(n));
                published.push(n);
            }
        }
        assert_eq!(published.len(), 100);
        assert!(published.windows(2).all(|pair| pair[1] - pair[0] == 3));
    }

    #[test]
    fn test_elapsed() {
        let throttle = Throttle::new(ms(500), ms(2000));
        assert_eq!(throttle.elapsed(ms(3000)), ms(1000));
    }

    #[test]
    fn test_clock_going_backwards() {
        let throttle = Throttle::from_rate(2.0, ms(3000));
        assert_eq!(throttle.elapsed(ms(1000)), Duration::ZERO);
        assert!(!throttle.ready(ms(1000)));
    }
}
