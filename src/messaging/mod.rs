mod consumer;
mod producer;

pub use consumer::OrderConsumer;
pub use producer::OrderProducer;
