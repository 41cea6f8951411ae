use bridge_common::Incident;
use bridge_dlo::SerializedDeadLetter;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct SubmitMessageData {
    pub sms_id: String,
    pub queue_depth: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthData {
    pub status: &'static str,
    pub timestamp: u64,
    pub components: HealthComponents,
}

#[derive(Debug, Serialize)]
pub struct HealthComponents {
    pub queue: QueueComponent,
    pub telegram: TelegramComponent,
    pub nodes: NodesComponent,
}

#[derive(Debug, Serialize)]
pub struct QueueComponent {
    pub depth: usize,
    pub capacity: usize,
    pub running: bool,
}

#[derive(Debug, Serialize)]
pub struct TelegramComponent {
    pub connected: bool,
    pub rate_limited: bool,
}

#[derive(Debug, Serialize)]
pub struct NodesComponent {
    pub tracked: usize,
    pub stale: usize,
}

#[derive(Debug, Serialize)]
pub struct MetricsData {
    pub queue: QueueMetricsDto,
    pub telegram: TelegramMetricsDto,
    pub email: EmailMetricsDto,
    pub dlo: DloMetricsDto,
    pub agent: AgentMetricsDto,
}

#[derive(Debug, Serialize)]
pub struct QueueMetricsDto {
    pub total_enqueued: u64,
    pub total_delivered: u64,
    pub total_failed: u64,
    pub current_depth: usize,
    pub running: bool,
    pub consumers: usize,
}

#[derive(Debug, Serialize)]
pub struct TelegramMetricsDto {
    pub total_sent: u64,
    pub total_rate_limited: u64,
    pub total_errors: u64,
    pub connected: bool,
    pub rate_limited: bool,
}

#[derive(Debug, Serialize)]
pub struct EmailMetricsDto {
    pub total_sent: u64,
    pub total_errors: u64,
}

#[derive(Debug, Serialize)]
pub struct DloMetricsDto {
    pub count: usize,
    pub dlo_overflow: u64,
}

#[derive(Debug, Serialize)]
pub struct AgentMetricsDto {
    pub total_suppressed: u64,
    pub total_delivered: u64,
    pub total_failed: u64,
}

#[derive(Debug, Serialize)]
pub struct DloListData {
    pub count: usize,
    pub dead_letters: Vec<SerializedDeadLetter>,
}

#[derive(Debug, Serialize)]
pub struct PurgeData {
    pub purged: usize,
}

#[derive(Debug, Serialize)]
pub struct IncidentsData {
    pub count: usize,
    pub incidents: Vec<Incident>,
}
