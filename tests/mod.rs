mod support;

mod backend;
mod capture;
mod classify;
mod presentation;
mod rail;
mod telemetry;
