mod prop_pagination;
mod prop_pipeline;
mod prop_rewrite;
