mod runner;
mod scenarios;
mod simulator;
