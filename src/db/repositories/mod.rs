mod exercises;
mod sessions;
