// Domain layer: models, the work item wire model and ports (interfaces).

pub mod model;
pub mod ports;
pub mod work_item;
