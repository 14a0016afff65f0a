
use std::borrow::Cow;
use std::iter::{ExactSizeIterator};
use std::io::{self, Stdout, Write};
use std::time::Duration;

use pbr::ProgressBar;

/// Ticks a progress bar for every item pulled from `inner`. With
/// `quiet` set nothing is drawn.
pub struct ReportingIterator<I>
  where I: ExactSizeIterator,
{
  name: Cow<'static, str>,
  progress: Option<ProgressBar<Stdout>>,
  inner: I,
}
impl<I> ReportingIterator<I>
  where I: ExactSizeIterator,
{
  pub fn new(inner: I, name: Cow<'static, str>) -> ReportingIterator<I> {
    let mut p = ProgressBar::new(inner.len() as _);
    p.show_speed = true;
    p.show_percent = true;
    p.show_counter = true;
    p.show_time_left = true;

    let fps = Duration::new(1, 0) / 60;
    p.set_max_refresh_rate(Some(fps));

    let msg = format!("{}: ", name);
    p.message(&msg[..]);
    ReportingIterator {
      name,
      progress: Some(p),
      inner,
    }
  }
  pub fn quiet(inner: I, name: Cow<'static, str>) -> ReportingIterator<I> {
    ReportingIterator {
      name,
      progress: None,
      inner,
    }
  }

  pub fn name(&self) -> &str { &self.name[..] }
}

impl<I> Iterator for ReportingIterator<I>
  where I: ExactSizeIterator,
{
  type Item = I::Item;
  fn next(&mut self) -> Option<Self::Item> {
    let next = self.inner.next();
    if let Some(ref mut progress) = self.progress {
      match next {
        Some(_) => { progress.inc(); },
        None => {
          let msg = format!("{} done!", self.name);
          progress.finish_println(&msg);
          let _ = io::stdout().flush();
        },
      }
    }
    if next.is_none() {
      self.progress = None;
    }
    next
  }
  fn size_hint(&self) -> (usize, Option<usize>) { self.inner.size_hint() }
}
impl<I> ExactSizeIterator for ReportingIterator<I>
  where I: ExactSizeIterator,
{ }

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn passes_items_through() {
    let it = ReportingIterator::quiet(0..4usize, "steps".into());
    assert_eq!(it.len(), 4);
    assert_eq!(it.name(), "steps");
    let v: Vec<_> = it.collect();
    assert_eq!(v, vec![0, 1, 2, 3]);
  }
}
