use super::{
    global_constraint::GlobalConstraintType,
    route_constraint::RouteConstraintType,
};

#[derive(Clone)]
pub enum Constraint {
    Global(GlobalConstraintType),
    Route(RouteConstraintType),
}

impl Constraint {
    pub fn constraint_name(&self) -> &'static str {
        match self {
            Constraint::Global(c) => c.constraint_name(),
            Constraint::Route(c) => c.constraint_name(),
        }
    }
}
