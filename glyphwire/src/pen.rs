// Copyright 2025 the Glyphwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared solid-color source pictures.
//!
//! A pen is a 1×1 repeating picture filled with one color, used as the source when
//! compositing glyphs. Many renderers paint with the same few colors, so pens live in a
//! [`PenPool`] shared by all of them. Entries are reference counted by the [`Pen`]
//! handles pointing at them; an entry nobody uses anymore keeps its picture and is
//! repainted when a new color is requested, so the number of remote pictures stays at
//! the number of colors in use at the same time.

use core::cell::RefCell;
use core::fmt;
use std::rc::Rc;

use log::{debug, trace};

use crate::color::Color;
use crate::error::Error;
use crate::remote::{
    ErrorDispatch, ErrorLatch, PictFormat, PictOp, Rectangle, RenderConnection, Repeat,
    ResourceId, Subscription,
};

const PIXEL: Rectangle = Rectangle {
    x: 0,
    y: 0,
    width: 1,
    height: 1,
};

struct PenEntry {
    format: PictFormat,
    color: Color,
    pixmap: ResourceId,
    picture: ResourceId,
    refs: usize,
    latch: ErrorLatch,
    _subscriptions: [Subscription; 2],
}

impl PenEntry {
    fn is_usable(&self) -> bool {
        !self.latch.is_tripped()
    }
}

/// A pool of pens shared by every renderer of a [`TextContext`](crate::TextContext).
///
/// Dropping the last reference frees every picture and pixmap of the pool.
pub struct PenPool {
    conn: Rc<dyn RenderConnection>,
    errors: ErrorDispatch,
    entries: RefCell<Vec<PenEntry>>,
}

impl PenPool {
    /// Creates an empty pool.
    pub fn new(conn: Rc<dyn RenderConnection>, errors: ErrorDispatch) -> Rc<Self> {
        Rc::new(Self {
            conn,
            errors,
            entries: RefCell::new(Vec::new()),
        })
    }

    /// Returns a pen painting `color` in pictures of `format`.
    ///
    /// Reuses an entry with the same format and color if there is one, otherwise
    /// repaints the first unused entry of the format, and only allocates a new picture
    /// when neither exists.
    pub fn pen(self: &Rc<Self>, format: PictFormat, color: Color) -> Result<Pen, Error> {
        let slot = self.acquire(format, color)?;
        Ok(Pen {
            pool: self.clone(),
            slot,
        })
    }

    /// Number of entries, used or not.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Whether the pool holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Number of entries referenced by at least one pen.
    pub fn live(&self) -> usize {
        self.entries.borrow().iter().filter(|e| e.refs > 0).count()
    }

    fn acquire(&self, format: PictFormat, color: Color) -> Result<usize, Error> {
        let mut entries = self.entries.borrow_mut();
        if let Some((slot, entry)) = entries
            .iter_mut()
            .enumerate()
            .find(|(_, e)| e.format == format && e.color == color && e.is_usable())
        {
            entry.refs += 1;
            trace!("pen {color:?}: hit, {} users", entry.refs);
            return Ok(slot);
        }
        if let Some((slot, entry)) = entries
            .iter_mut()
            .enumerate()
            .find(|(_, e)| e.format == format && e.refs == 0 && e.is_usable())
        {
            self.conn
                .fill_rectangles(PictOp::Src, entry.picture, color.to_render(), &[PIXEL])?;
            debug!("pen {:?}: recolored to {color:?}", entry.color);
            entry.color = color;
            entry.refs = 1;
            return Ok(slot);
        }
        let entry = self.allocate(format, color)?;
        entries.push(entry);
        Ok(entries.len() - 1)
    }

    fn allocate(&self, format: PictFormat, color: Color) -> Result<PenEntry, Error> {
        let conn = &*self.conn;
        let pixmap = conn.generate_id()?;
        conn.create_pixmap(format.depth(), pixmap, conn.root(), 1, 1)?;
        let picture = match conn.generate_id() {
            Ok(picture) => picture,
            Err(err) => {
                let _ = conn.free_pixmap(pixmap);
                return Err(err.into());
            }
        };
        let created = conn
            .create_picture(picture, pixmap, format, Repeat::Normal)
            .and_then(|()| conn.fill_rectangles(PictOp::Src, picture, color.to_render(), &[PIXEL]));
        if let Err(err) = created {
            let _ = conn.free_picture(picture);
            let _ = conn.free_pixmap(pixmap);
            return Err(err.into());
        }
        debug!("pen {color:?}: allocated picture {picture:#x} ({format:?})");
        let latch = ErrorLatch::new("pen");
        let subscriptions = [
            self.errors.subscribe(pixmap, &latch),
            self.errors.subscribe(picture, &latch),
        ];
        Ok(PenEntry {
            format,
            color,
            pixmap,
            picture,
            refs: 1,
            latch,
            _subscriptions: subscriptions,
        })
    }

    fn release(&self, slot: usize) {
        if let Some(entry) = self.entries.borrow_mut().get_mut(slot) {
            entry.refs = entry.refs.saturating_sub(1);
        }
    }

    fn with_entry<R>(&self, slot: usize, f: impl FnOnce(&PenEntry) -> R) -> Option<R> {
        self.entries.borrow().get(slot).map(f)
    }
}

impl Drop for PenPool {
    fn drop(&mut self) {
        for entry in self.entries.get_mut().drain(..) {
            let _ = self.conn.free_picture(entry.picture);
            let _ = self.conn.free_pixmap(entry.pixmap);
        }
    }
}

impl fmt::Debug for PenPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PenPool")
            .field("entries", &self.len())
            .field("live", &self.live())
            .finish_non_exhaustive()
    }
}

/// A reference to a pen of a [`PenPool`]; releases it on drop.
pub struct Pen {
    pool: Rc<PenPool>,
    slot: usize,
}

impl Pen {
    /// The source picture.
    pub fn picture(&self) -> ResourceId {
        self.pool.with_entry(self.slot, |e| e.picture).unwrap_or(0)
    }

    /// The color the pen paints.
    pub fn color(&self) -> Color {
        self.pool
            .with_entry(self.slot, |e| e.color)
            .unwrap_or_default()
    }

    /// The picture format of the pen.
    pub fn format(&self) -> PictFormat {
        self.pool
            .with_entry(self.slot, |e| e.format)
            .unwrap_or(PictFormat::Argb32)
    }

    /// Whether the pen's picture failed remotely.
    pub fn is_failed(&self) -> bool {
        self.pool
            .with_entry(self.slot, |e| !e.is_usable())
            .unwrap_or(true)
    }

    /// Switches the pen to `color`, releasing the old entry first so it can be recycled.
    ///
    /// On failure the pen keeps its old color.
    pub fn configure(&mut self, color: Color) -> Result<(), Error> {
        if self.color() == color && !self.is_failed() {
            return Ok(());
        }
        let format = self.format();
        self.pool.release(self.slot);
        match self.pool.acquire(format, color) {
            Ok(slot) => {
                self.slot = slot;
                Ok(())
            }
            Err(err) => {
                if let Some(entry) = self.pool.entries.borrow_mut().get_mut(self.slot) {
                    entry.refs += 1;
                }
                Err(err)
            }
        }
    }
}

impl Drop for Pen {
    fn drop(&mut self) {
        self.pool.release(self.slot);
    }
}

impl fmt::Debug for Pen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pen")
            .field("picture", &self.picture())
            .field("color", &self.color())
            .finish()
    }
}
