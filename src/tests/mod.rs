mod optimisation;
mod propagators;
mod scenarios;
