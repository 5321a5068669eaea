use time::OffsetDateTime;

pub trait TimeProvider: Send + Sync + 'static {
    fn now(&self) -> OffsetDateTime;
}
