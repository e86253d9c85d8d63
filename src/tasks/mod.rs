//! 后台定时任务。
//!
//! 启动时调用一次 `spawn_all`，任务通过 `tokio::spawn` 脱离运行，不会阻塞。

use crate::services::SegmentService;

/// 启动所有后台任务
///
/// - 分层全量重算：每 `recalc_interval_secs` 秒一次，0 表示不启动
pub fn spawn_all(segment_service: SegmentService, recalc_interval_secs: u64) {
    if recalc_interval_secs == 0 {
        log::info!("Periodic segment recalculation disabled");
        return;
    }

    tokio::spawn(async move {
        loop {
            tokio::time::sleep(std::time::Duration::from_secs(recalc_interval_secs)).await;
            match segment_service.bulk_recalculate_segments().await {
                Ok(r) if !r.failed.is_empty() => log::warn!(
                    "Periodic segment recalculation finished with failures, updated: {}, failed users: {:?}",
                    r.updated,
                    r.failed
                ),
                Ok(r) => log::debug!("Periodic segment recalculation updated: {}", r.updated),
                Err(e) => log::error!("Failed to recalculate segments: {e:?}"),
            }
        }
    });
}
