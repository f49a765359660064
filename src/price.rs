//! The book's price database.
//!
//! The database holds one reference to each price it contains. [`Price`]
//! views never hold a reference of their own: creation and lookup hand the
//! extra reference straight back. Removing a price from the database
//! releases it and makes its views stale.

use gnc_domain::{Commodity, Guid, IntoNumeric, Numeric, PriceSource, Time64};
use gnc_sys as ffi;
use tracing::{debug, warn};

use crate::error::{BackendErrorKind, BindingError, Result};
use crate::lifeline::{Handle, LiveBook};
use crate::marshal::{copy_str, guid_in, guid_out, numeric_out, to_cstring, truth};

/// A quote to record in the database.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PriceQuote {
    pub commodity: Commodity,
    pub currency: Commodity,
    pub time: Time64,
    pub value: Numeric,
    pub source: PriceSource,
    /// Free-form kind such as `last`, `bid`, `ask` or `nav`.
    pub type_string: String,
}

impl PriceQuote {
    pub fn new(commodity: Commodity, currency: Commodity, time: Time64, value: Numeric) -> Self {
        Self {
            commodity,
            currency,
            time,
            value,
            source: PriceSource::UserPrice,
            type_string: "last".into(),
        }
    }
}

fn commodity_names(commodity: &Commodity) -> Result<(std::ffi::CString, std::ffi::CString)> {
    Ok((
        to_cstring(&commodity.namespace, "commodity namespace")?,
        to_cstring(&commodity.mnemonic, "commodity mnemonic")?,
    ))
}

unsafe fn read_commodity(
    native: &dyn ffi::NativeEngine,
    raw: *mut ffi::gnc_commodity,
) -> Option<Commodity> {
    if raw.is_null() {
        return None;
    }
    Some(Commodity::new(
        copy_str(native.commodity_get_namespace(raw)),
        copy_str(native.commodity_get_mnemonic(raw)),
    ))
}

unsafe fn read_quote(native: &dyn ffi::NativeEngine, raw: *mut ffi::GNCPrice) -> Result<PriceQuote> {
    let commodity = read_commodity(native, native.price_get_commodity(raw))
        .ok_or(BindingError::InvalidHandle("commodity"))?;
    let currency = read_commodity(native, native.price_get_currency(raw))
        .ok_or(BindingError::InvalidHandle("commodity"))?;
    Ok(PriceQuote {
        commodity,
        currency,
        time: Time64::from_secs(native.price_get_time(raw)),
        value: numeric_out(native.price_get_value(raw))?,
        source: PriceSource::from_code(native.price_get_source(raw)),
        type_string: copy_str(native.price_get_typestr(raw)),
    })
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PriceDb {
    handle: Handle<ffi::GNCPriceDB>,
}

impl PriceDb {
    pub(crate) fn from_handle(handle: Handle<ffi::GNCPriceDB>) -> Self {
        Self { handle }
    }

    pub fn price_count(&self) -> Result<usize> {
        self.handle
            .with(|live, raw| unsafe { live.native().pricedb_get_num_prices(raw) } as usize)
    }

    /// Records a quote. The returned view stays valid while the price is in
    /// the database.
    pub fn create_price(&self, quote: &PriceQuote) -> Result<Price> {
        let (commodity_ns, commodity_sym) = commodity_names(&quote.commodity)?;
        let (currency_ns, currency_sym) = commodity_names(&quote.currency)?;
        let type_string = to_cstring(&quote.type_string, "price type")?;
        let handle = self.handle.try_with(|live, db| {
            let native = live.native();
            unsafe {
                let book = live.book();
                let commodity =
                    native.commodity_find_or_create(book, commodity_ns.as_ptr(), commodity_sym.as_ptr());
                let currency =
                    native.commodity_find_or_create(book, currency_ns.as_ptr(), currency_sym.as_ptr());
                if commodity.is_null() || currency.is_null() {
                    return Err(BindingError::InvalidHandle("commodity"));
                }
                let raw = native.price_create(book);
                let handle = live.wrap(raw, "price")?;
                native.price_begin_edit(raw);
                native.price_set_commodity(raw, commodity);
                native.price_set_currency(raw, currency);
                native.price_set_time(raw, quote.time.secs());
                native.price_set_value(raw, quote.value.into());
                native.price_set_source(raw, quote.source.code());
                native.price_set_typestr(raw, type_string.as_ptr());
                native.price_commit_edit(raw);
                let added = truth(native.pricedb_add_price(db, raw));
                native.price_unref(raw);
                if !added {
                    return Err(BindingError::NativeCallFailed {
                        operation: "price database add",
                        kind: BackendErrorKind::Misc,
                        message: "the price database refused the price".into(),
                    });
                }
                Ok(handle)
            }
        })?;
        debug!(commodity = %quote.commodity, currency = %quote.currency, "price recorded");
        Ok(Price::from_handle(handle))
    }

    /// Takes a price out of the database. All of its views go stale.
    pub fn remove_price(&self, price: &Price) -> Result<()> {
        self.handle.try_with(|live, db| {
            let raw = live.check(&price.handle)?;
            let removed = truth(unsafe { live.native().pricedb_remove_price(db, raw) });
            if removed {
                live.retire(price.handle.addr());
                Ok(())
            } else {
                Err(BindingError::ForeignEntity(
                    "price is not in this price database".into(),
                ))
            }
        })
    }

    /// Most recent quote for the pair.
    pub fn latest(&self, commodity: &Commodity, currency: &Commodity) -> Result<Option<Price>> {
        self.lookup(commodity, currency, |native, db, c, cur| unsafe {
            native.pricedb_lookup_latest(db, c, cur)
        })
    }

    /// Quote closest in time to `when`, before or after.
    pub fn nearest(
        &self,
        commodity: &Commodity,
        currency: &Commodity,
        when: Time64,
    ) -> Result<Option<Price>> {
        self.lookup(commodity, currency, move |native, db, c, cur| unsafe {
            native.pricedb_lookup_nearest(db, c, cur, when.secs())
        })
    }

    pub fn price_by_guid(&self, guid: &Guid) -> Result<Option<Price>> {
        self.handle.with(|live, _db| {
            let raw_guid = guid_in(guid);
            let raw = unsafe { live.native().price_lookup(&raw_guid, live.book()) };
            live.wrap_opt(raw, "price").map(Price::from_handle)
        })
    }

    fn lookup(
        &self,
        commodity: &Commodity,
        currency: &Commodity,
        find: impl FnOnce(
            &dyn ffi::NativeEngine,
            *mut ffi::GNCPriceDB,
            *mut ffi::gnc_commodity,
            *mut ffi::gnc_commodity,
        ) -> *mut ffi::GNCPrice,
    ) -> Result<Option<Price>> {
        let (commodity_ns, commodity_sym) = commodity_names(commodity)?;
        let (currency_ns, currency_sym) = commodity_names(currency)?;
        self.handle.with(|live, db| {
            let native = live.native();
            let (c, cur) = unsafe {
                (
                    native.commodity_lookup(live.book(), commodity_ns.as_ptr(), commodity_sym.as_ptr()),
                    native.commodity_lookup(live.book(), currency_ns.as_ptr(), currency_sym.as_ptr()),
                )
            };
            if c.is_null() || cur.is_null() {
                return None;
            }
            let raw = find(native, db, c, cur);
            let price = live.wrap_opt(raw, "price").map(Price::from_handle);
            release_lookup_ref(live, raw);
            price
        })
    }
}

fn release_lookup_ref(live: &LiveBook<'_>, raw: *mut ffi::GNCPrice) {
    if !raw.is_null() {
        unsafe { live.native().price_unref(raw) };
    }
}

/// A view of one price held by the database.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Price {
    handle: Handle<ffi::GNCPrice>,
}

impl Price {
    pub(crate) fn from_handle(handle: Handle<ffi::GNCPrice>) -> Self {
        Self { handle }
    }

    pub fn guid(&self) -> Result<Guid> {
        self.handle
            .with(|live, raw| guid_out(unsafe { live.native().price_get_guid(raw) }))
    }

    pub fn commodity(&self) -> Result<Option<Commodity>> {
        self.handle.with(|live, raw| unsafe {
            read_commodity(live.native(), live.native().price_get_commodity(raw))
        })
    }

    pub fn currency(&self) -> Result<Option<Commodity>> {
        self.handle.with(|live, raw| unsafe {
            read_commodity(live.native(), live.native().price_get_currency(raw))
        })
    }

    pub fn time(&self) -> Result<Time64> {
        self.handle
            .with(|live, raw| Time64::from_secs(unsafe { live.native().price_get_time(raw) }))
    }

    pub fn value(&self) -> Result<Numeric> {
        self.handle
            .try_with(|live, raw| numeric_out(unsafe { live.native().price_get_value(raw) }))
    }

    pub fn source(&self) -> Result<PriceSource> {
        self.handle
            .with(|live, raw| PriceSource::from_code(unsafe { live.native().price_get_source(raw) }))
    }

    pub fn type_string(&self) -> Result<String> {
        self.handle
            .with(|live, raw| unsafe { copy_str(live.native().price_get_typestr(raw)) })
    }

    /// The source as the engine spells it, such as `user:price`.
    pub fn source_string(&self) -> Result<String> {
        self.handle
            .with(|live, raw| unsafe { copy_str(live.native().price_get_source_string(raw)) })
    }

    /// The same quote seen from the other side: commodity and currency
    /// swapped, value inverted, source [`PriceSource::Temporary`]. Nothing
    /// is added to the database; pass the result to
    /// [`PriceDb::create_price`] to keep it.
    pub fn invert(&self) -> Result<PriceQuote> {
        self.handle.try_with(|live, raw| {
            let native = live.native();
            let inverse = unsafe { native.price_invert(raw) };
            if inverse.is_null() {
                return Err(BindingError::InvalidHandle("price"));
            }
            let quote = unsafe { read_quote(native, inverse) };
            unsafe { native.price_unref(inverse) };
            quote
        })
    }

    pub fn edit(&self) -> Result<PriceEdit<'_>> {
        let addr = self.handle.addr();
        self.handle.life().claim_edit(addr, "price")?;
        let begun = self
            .handle
            .with(|live, raw| unsafe { live.native().price_begin_edit(raw) });
        if let Err(err) = begun {
            self.handle.life().release_edit(addr);
            return Err(err);
        }
        Ok(PriceEdit {
            price: self,
            done: false,
        })
    }

    /// The native pointer, for engine functions this crate does not wrap.
    ///
    /// # Safety
    /// Valid only while the book is open and the price is in the database.
    pub unsafe fn as_raw(&self) -> *mut ffi::GNCPrice {
        self.handle.as_ptr()
    }
}

/// An open price edit, committed by [`PriceEdit::commit`] or on drop.
pub struct PriceEdit<'a> {
    price: &'a Price,
    done: bool,
}

impl PriceEdit<'_> {
    pub fn set_value(&self, value: impl IntoNumeric) -> Result<()> {
        let value = value.into_numeric()?;
        self.price
            .handle
            .with(|live, raw| unsafe { live.native().price_set_value(raw, value.into()) })
    }

    pub fn set_time(&self, when: Time64) -> Result<()> {
        self.price
            .handle
            .with(|live, raw| unsafe { live.native().price_set_time(raw, when.secs()) })
    }

    pub fn set_source(&self, source: PriceSource) -> Result<()> {
        self.price
            .handle
            .with(|live, raw| unsafe { live.native().price_set_source(raw, source.code()) })
    }

    /// Sets the source by its engine spelling. Names the engine does not
    /// know are refused rather than ignored.
    pub fn set_source_string(&self, source: &str) -> Result<()> {
        let known = PriceSource::from_str_lossy(source);
        if known == PriceSource::Invalid {
            return Err(BindingError::InvalidArgument(format!(
                "unknown price source `{source}`"
            )));
        }
        let source = to_cstring(source, "price source")?;
        self.price
            .handle
            .with(|live, raw| unsafe { live.native().price_set_source_string(raw, source.as_ptr()) })
    }

    pub fn set_type_string(&self, kind: &str) -> Result<()> {
        let kind = to_cstring(kind, "price type")?;
        self.price
            .handle
            .with(|live, raw| unsafe { live.native().price_set_typestr(raw, kind.as_ptr()) })
    }

    pub fn commit(mut self) -> Result<()> {
        self.finish()
    }

    fn finish(&mut self) -> Result<()> {
        self.done = true;
        let handle = &self.price.handle;
        let committed =
            handle.with(|live, raw| unsafe { live.native().price_commit_edit(raw) });
        handle.life().release_edit(handle.addr());
        committed
    }
}

impl Drop for PriceEdit<'_> {
    fn drop(&mut self) {
        if !self.done {
            if let Err(err) = self.finish() {
                warn!(error = %err, "price edit could not be committed");
            }
        }
    }
}
