#[cfg(test)]
mod fixtures;

#[cfg(test)]
mod removal_tests;
#[cfg(test)]
mod trigger_tests;
