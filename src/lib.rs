pub mod database_ops;
pub mod domain;
pub mod etl;
pub mod tracing;

pub mod util {
    pub mod db;
    pub mod env;
}

#[cfg(test)]
mod testing;
