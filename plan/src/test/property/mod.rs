pub mod plan_props;
